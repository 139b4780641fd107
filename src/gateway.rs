//! Name-based operation dispatch.
//!
//! A [`Gateway`] is the operation set of one store: a static registry from
//! wire method name to a typed handler and its declared parameter names.
//! Registries are built once by explicit declaration lists and are read-only
//! afterwards, so a gateway can be shared between concurrent requests.

use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::logging::{debug, warn};
use crate::params::{Arguments, ParamNames};
use crate::schema::OperationDescriptor;
use crate::store::StoreError;
use crate::{Error, Result};

/// Boxed future of an invocation's serialized result
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Decodes the arguments of a call and starts the operation
type InvokeFn =
    Box<dyn Fn(&Map<String, Value>, &[&'static str]) -> Result<BoxFuture> + Send + Sync>;

/// An async function usable as an operation handler
///
/// Implemented for `Fn(A1, .., An) -> Fut` with up to six arguments, where
/// `Fut` resolves to `Result<O, StoreError>`.
pub trait Handler<Args>: Send + Sync + 'static {
    /// Operation result type
    type Output;

    /// Future returned by the operation
    type Future: Future<Output = std::result::Result<Self::Output, StoreError>> + Send + 'static;

    /// Call the operation with decoded arguments
    fn call(&self, args: Args) -> Self::Future;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        impl<F, Fut, O, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = std::result::Result<O, StoreError>> + Send + 'static,
        {
            type Output = O;
            type Future = Fut;

            #[allow(non_snake_case)]
            fn call(&self, args: ($($ty,)*)) -> Self::Future {
                let ($($ty,)*) = args;
                (self)($($ty),*)
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);

/// A registered operation
struct Operation {
    names: ParamNames,
    arity: usize,
    invoke: InvokeFn,
    descriptor: OperationDescriptor,
}

/// Operation set of one store, dispatched by method name
pub struct Gateway {
    /// Target label used in diagnostics
    target: String,
    /// Registered operations by wire name
    operations: HashMap<String, Operation>,
}

impl Gateway {
    /// Create an empty gateway for the named target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            operations: HashMap::new(),
        }
    }

    /// Target label of this gateway
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Register an operation under `method` with its ordered parameter names
    ///
    /// Registering an existing name replaces the earlier operation.
    pub fn register<H, Args>(&mut self, method: &str, names: impl Into<ParamNames>, handler: H)
    where
        H: Handler<Args>,
        H::Output: Serialize + JsonSchema + Send + 'static,
        Args: Arguments,
    {
        let names = names.into();
        if let Err(err) = names.resolve(method, Args::ARITY) {
            warn!("{} on [{}]; calls will fail", err, self.target);
        }

        let descriptor = OperationDescriptor::new::<Args, H::Output>(method, &names);
        let invoke: InvokeFn = Box::new(
            move |payload: &Map<String, Value>, names: &[&'static str]| -> Result<BoxFuture> {
                let args = Args::from_payload(payload, names)?;
                let pending = handler.call(args);
                let future: BoxFuture = Box::pin(async move {
                    let output = pending.await.map_err(Error::from)?;
                    serde_json::to_value(output).map_err(Error::from)
                });
                Ok(future)
            },
        );

        let operation = Operation {
            names,
            arity: Args::ARITY,
            invoke,
            descriptor,
        };
        if self.operations.insert(method.to_string(), operation).is_some() {
            warn!("Replaced operation [{}] on [{}]", method, self.target);
        }
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Descriptors of every registered operation, sorted by name
    pub fn catalog(&self) -> Vec<&OperationDescriptor> {
        let mut catalog: Vec<&OperationDescriptor> = self
            .operations
            .values()
            .map(|operation| &operation.descriptor)
            .collect();
        catalog.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        catalog
    }

    /// Invoke `method` with the named parameters in `payload`
    ///
    /// The payload must be a JSON object or `null`. Fields absent from the
    /// payload yield the parameter type's default value; fields that name no
    /// parameter are ignored. Errors raised by the operation itself are
    /// returned unchanged as [`Error::Store`].
    pub async fn invoke(&self, method: &str, payload: Value) -> Result<Value> {
        let operation = self
            .operations
            .get(method)
            .ok_or_else(|| Error::MethodNotFound {
                method: method.to_string(),
                target: self.target.clone(),
            })?;

        let names = operation.names.resolve(method, operation.arity)?;

        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(Error::InvalidPayload(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )));
            }
        };

        debug!("Invoking [{}] on [{}]", method, self.target);
        let pending = (operation.invoke)(&payload, names)?;
        pending.await
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
