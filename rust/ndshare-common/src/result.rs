pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns an `InvalidArgument` error from the enclosing function when the
/// predicate does not hold. The error message is the stringified predicate.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Same as [`verify_arg!`], but reports an `InvalidShape` error.
#[macro_export]
macro_rules! verify_shape {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_shape(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_shape(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_shape(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_shape(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidShape {
        expected: condition.to_string(),
        actual: format!("{name} violating it"),
    }
    .into())
}
