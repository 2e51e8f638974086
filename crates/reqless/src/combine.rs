use crate::config::Instantiation;

/// Merge two configuration layers, preferring the values in `self`.
///
/// Layers are combined from the highest precedence down: the CLI-provided file
/// wins over the project file, which wins over user and system files.
pub trait Combine {
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

macro_rules! impl_combine_or {
    ($name:ty) => {
        impl Combine for Option<$name> {
            fn combine(self, other: Option<$name>) -> Option<$name> {
                self.or(other)
            }
        }
    };
}

impl_combine_or!(String);
impl_combine_or!(bool);
impl_combine_or!(Instantiation);
