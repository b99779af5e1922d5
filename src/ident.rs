//! Utility functions for working with identifiers.

use heck::ToUpperCamelCase;

/// Converts an identifier as written in a schema to the `UpperCamel` form
/// used for generated type and method names.
pub fn to_pascal(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Converts a dotted reference to the flattened Pascal form used for
/// generated class names, e.g. `outer.inner` becomes `Outer_Inner`.
pub fn to_pascal_path(s: &str) -> String {
    s.split('.')
        .map(to_pascal)
        .collect::<Vec<_>>()
        .join("_")
}

/// Splits a dotted package into its namespace segments, dropping empty
/// segments so that an empty package yields no namespaces.
pub fn package_segments(package: &str) -> Vec<&str> {
    package.split('.').filter(|s| !s.is_empty()).collect()
}
