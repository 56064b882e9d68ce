//! Full names of the types the compiler itself relies on.

pub const INT: &str = "Nar.Base.Math.Int";
pub const FLOAT: &str = "Nar.Base.Math.Float";
pub const CHAR: &str = "Nar.Base.Char.Char";
pub const STRING: &str = "Nar.Base.String.String";
pub const UNIT: &str = "Nar.Base.Basics.Unit";
pub const LIST: &str = "Nar.Base.List.List";
pub const BOOL: &str = "Nar.Base.Basics.Bool";

pub const TRUE: &str = "True";
pub const FALSE: &str = "False";

/// Type parameters whose name starts with this prefix only accept numbers.
pub const NUMBER_PREFIX: &str = "number";
