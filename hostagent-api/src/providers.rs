pub(crate) mod http;
pub(crate) mod in_memory;
