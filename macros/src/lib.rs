mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a documentation function for the route, named after the handler
/// function with the suffix `_docs`, for use with `aide`'s `*_with` routing.
///
/// The first doc comment line becomes the summary and the remaining lines the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates two input structs next to the model: `CreateXInput` and `UpdateXInput`.
/// Fields with `#[serde(skip_deserializing)]` or `#[serde(skip)]` are left out of both;
/// every other field is copied with its attributes, and wrapped in `Option` for the update input.
#[proc_macro_attribute]
pub fn model(_args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(input)
}
