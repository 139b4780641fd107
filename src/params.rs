//! Declared parameter names and positional argument decoding.
//!
//! Every registered operation declares the ordered names of its formal
//! parameters. The payload of a call is a JSON object; field `names[i]`
//! feeds argument `i` of the operation.

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Ordered parameter names declared for an operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamNames(Option<Vec<&'static str>>);

impl ParamNames {
    /// No declared names; only valid for operations without parameters
    pub fn none() -> Self {
        Self(None)
    }

    /// Declare names in signature order
    pub fn declared<I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        Self(Some(names.into_iter().collect()))
    }

    /// Resolve the names for a call against the operation's arity
    ///
    /// Fails when the declaration is missing, has the wrong length, or
    /// contains empty or repeated names.
    pub fn resolve(&self, method: &str, arity: usize) -> Result<&[&'static str]> {
        let unavailable = || Error::ParameterNamesUnavailable {
            method: method.to_string(),
        };

        let names = match &self.0 {
            Some(names) => names.as_slice(),
            None if arity == 0 => return Ok(&[]),
            None => return Err(unavailable()),
        };

        if names.len() != arity {
            return Err(unavailable());
        }

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() || names[..i].contains(name) {
                return Err(unavailable());
            }
        }

        Ok(names)
    }
}

impl<const N: usize> From<[&'static str; N]> for ParamNames {
    fn from(names: [&'static str; N]) -> Self {
        Self::declared(names)
    }
}

/// Decode one named field; absent and `null` fields yield the type's default
pub fn decode_param<T>(payload: &Map<String, Value>, name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match payload.get(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(raw) => {
            T::deserialize(raw).map_err(|err| Error::parameter_deserialization(name, raw, err))
        }
    }
}

/// Positional argument list of an operation
///
/// Implemented for tuples of up to six parameter types.
pub trait Arguments: Sized + Send + 'static {
    /// Number of formal parameters
    const ARITY: usize;

    /// Decode every argument from the payload, in order
    ///
    /// `names` must hold exactly [`Self::ARITY`] entries.
    fn from_payload(payload: &Map<String, Value>, names: &[&'static str]) -> Result<Self>;

    /// JSON schema of each parameter type, in order
    fn schemas() -> Vec<Value>;
}

macro_rules! impl_arguments {
    ($count:expr; $($ty:ident => $idx:tt),*) => {
        impl<$($ty,)*> Arguments for ($($ty,)*)
        where
            $($ty: DeserializeOwned + Default + JsonSchema + Send + 'static,)*
        {
            const ARITY: usize = $count;

            #[allow(unused_variables)]
            fn from_payload(payload: &Map<String, Value>, names: &[&'static str]) -> Result<Self> {
                Ok(($(decode_param::<$ty>(payload, names[$idx])?,)*))
            }

            fn schemas() -> Vec<Value> {
                vec![$(serde_json::to_value(schema_for!($ty)).unwrap_or(Value::Null)),*]
            }
        }
    };
}

impl_arguments!(0;);
impl_arguments!(1; A1 => 0);
impl_arguments!(2; A1 => 0, A2 => 1);
impl_arguments!(3; A1 => 0, A2 => 1, A3 => 2);
impl_arguments!(4; A1 => 0, A2 => 1, A3 => 2, A4 => 3);
impl_arguments!(5; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4);
impl_arguments!(6; A1 => 0, A2 => 1, A3 => 2, A4 => 3, A5 => 4, A6 => 5);
