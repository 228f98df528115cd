//! Provider catalog
//!
//! Static descriptors for every supported provider: base URL templates,
//! authentication descriptors, modules and metadata inputs.
//! [`Catalog::read_info`] and [`Catalog::resolve`] substitute `{{var}}`
//! placeholders from caller-supplied [`Variables`](crate::template::Variables).

mod registry;
mod types;

pub use registry::{Catalog, ResolvedProvider};
pub use types::{
    module_url, AuthDescriptor, AuthType, CustomInput, MetadataInput, ModuleInfo, ProviderInfo,
    ROOT_MODULE,
};
