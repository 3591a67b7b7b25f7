//! Error type shared by constructors and validation helpers.

use std::borrow::Cow;

/// Errors raised by this crate.
///
/// Failures of the wrapped supplier are never converted into this type; they
/// reach the caller of `try_get` (or unwind through `get`) unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
   /// A required argument was absent.
   ///
   /// The message is optional: [`require_lazy_with`](crate::require_lazy_with)
   /// forwards whatever the caller passed, including nothing at all.
   #[error("{}", .message.as_deref().unwrap_or("invalid argument"))]
   InvalidArgument { message: Option<Cow<'static, str>> },
}

impl Error {
   /// Message carried when a constructor is given no supplier.
   pub const SUPPLIER_REQUIRED: &'static str = "supplier is required but none was given";

   /// Default message carried by [`require_lazy`](crate::require_lazy).
   pub const LAZY_REQUIRED: &'static str = "lazy value is required but none was given";

   #[inline]
   pub(crate) const fn supplier_required() -> Self {
      Self::InvalidArgument {
         message: Some(Cow::Borrowed(Self::SUPPLIER_REQUIRED)),
      }
   }

   /// Creates an `InvalidArgument` error with an optional message.
   #[inline]
   pub fn invalid_argument(message: Option<impl Into<Cow<'static, str>>>) -> Self {
      Self::InvalidArgument {
         message: message.map(Into::into),
      }
   }

   /// Returns the carried message, if any.
   #[inline]
   pub fn message(&self) -> Option<&str> {
      match self {
         Self::InvalidArgument { message } => message.as_deref(),
      }
   }
}

/// Result alias defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn display_uses_message_or_fallback() {
      assert_eq!(
         Error::supplier_required().to_string(),
         Error::SUPPLIER_REQUIRED
      );
      assert_eq!(
         Error::invalid_argument(None::<&'static str>).to_string(),
         "invalid argument"
      );
      assert_eq!(
         Error::invalid_argument(Some(String::from("custom"))).message(),
         Some("custom")
      );
   }
}
