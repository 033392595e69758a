//! Mixin descriptors.

/// A `config`/`loader` mixin's declared signature, fetched once via
/// `SchemaClient::get_mixins` and checked against a class's `imports`
/// list.
#[derive(Clone, Debug, PartialEq)]
pub struct MixinDef {
    pub kind: String,
    pub args: Vec<String>,
    pub types: Vec<tt_types::Type>,
    pub required: Vec<bool>,
    pub is_input: Vec<bool>,
    pub facets: Vec<String>,
}

impl MixinDef {
    #[must_use]
    pub fn arg_index(&self, name: &str) -> Option<usize> {
        self.args.iter().position(|a| a == name)
    }
}
