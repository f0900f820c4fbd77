
use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Formats an error together with all of its sources, separated by `: `.
pub struct ErrorFmt<E>(pub E);

impl<E: Error> Display for ErrorFmt<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut next = Some(&self.0 as &dyn Error);
        let mut separator = "";
        while let Some(e) = next {
            write!(f, "{}{}", separator, e)?;
            separator = ": ";
            next = e.source();
        }
        Ok(())
    }
}
