//! Publishing support
//!
//! Nothing here talks to the network. [`PublishPreparer::prepare`] checks a
//! component against the strict rules and assembles the metadata and file
//! list; [`PublishPreparer::simulate`] turns that into a preview of the
//! marketplace entry.

mod preparer;
mod template;

pub use preparer::{
    file_type_for, PublishAuthor, PublishBundle, PublishComponent, PublishFailure, PublishFile,
    PublishOverrides, PublishPlan, PublishPreparer, PublishRejection, PublishResult,
    PublishSimulation, PublishingDetails, RepositoryInfo, MARKETPLACE_ORG_URL, PUBLISHING_STEPS,
};
pub use template::{PublishingTemplate, TemplateFile, TEMPLATE_INSTRUCTIONS};
