//! Entity declarations and typed accessors.

use crate::hooks::RecordHooks;
use crate::relation::Relation;

/// Static description of one table-backed entity type.
///
/// An entity is usually a unit struct: its associated consts describe the
/// table and its [`RecordHooks`] impl carries the lifecycle behavior.
/// Records are created with [`Record::new::<E>`](crate::Record::new).
///
/// # Example
///
/// ```ignore
/// use sqlrecord::prelude::*;
///
/// #[derive(Default)]
/// struct User;
///
/// impl RecordHooks for User {}
///
/// impl Entity for User {
///     const TABLE_NAME: &'static str = "user";
///     const COLUMNS: &'static [&'static str] = &["id", "name", "password"];
///     const RELATIONS: &'static [Relation] = &[
///         Relation::has_many("contacts", Record::new::<Contact>, "user_id", "id"),
///     ];
/// }
/// ```
pub trait Entity: RecordHooks + Default + 'static {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// Name of the primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Persisted columns.
    ///
    /// When non-empty, assignments to any other name are kept as custom
    /// data and never written. When empty, every assignment is a column.
    const COLUMNS: &'static [&'static str] = &[];

    /// Declared relations.
    const RELATIONS: &'static [Relation] = &[];
}

/// Declare a newtype over [`Record`](crate::Record) with typed accessors.
///
/// Each field produces a getter named after the column, returning
/// `Result<Option<T>>` (absent and NULL both read as `None`), and a setter
/// that marks the column dirty. The newtype derefs to `Record`, so the
/// query and persistence API stays available.
///
/// ```ignore
/// sqlrecord::typed_record! {
///     pub struct UserRecord for User {
///         id / set_id: i64,
///         name / set_name: String,
///         password / set_password: String,
///     }
/// }
///
/// let user = UserRecord::new(source);
/// user.set_name("demo").set_password("secret");
/// user.insert()?;
/// assert_eq!(user.name()?, Some("demo".to_string()));
/// ```
#[macro_export]
macro_rules! typed_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $entity:ty {
            $( $getter:ident / $setter:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name($crate::Record);

        #[allow(dead_code)]
        impl $name {
            /// Create a new record bound to `source`.
            $vis fn new(source: $crate::SharedSource) -> Self {
                Self($crate::Record::new::<$entity>(source))
            }

            /// Wrap an existing record, e.g. one returned by `find_all`.
            $vis fn from_record(record: $crate::Record) -> Self {
                Self(record)
            }

            /// Unwrap the untyped record.
            $vis fn into_record(self) -> $crate::Record {
                self.0
            }

            $(
                $vis fn $getter(&self) -> $crate::Result<::std::option::Option<$ty>> {
                    self.0.get_as::<::std::option::Option<$ty>>(stringify!($getter))
                }

                $vis fn $setter(&self, value: impl ::std::convert::Into<$ty>) -> &Self {
                    self.0.set(stringify!($getter), value.into());
                    self
                }
            )*
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::Record;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}
