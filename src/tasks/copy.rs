// src/tasks/copy.rs

//! Pass-through tasks: files are copied byte for byte.

use crate::context::BuildContext;
use crate::tasks::{AssetError, Emitted, SourceFile, Transform};
use crate::types::{AssetCategory, TaskId};

#[derive(Debug, Clone, Copy)]
pub struct Copy {
    id: TaskId,
    category: AssetCategory,
    label: &'static str,
}

impl Copy {
    pub fn for_task(id: TaskId) -> Option<Self> {
        let (category, label) = match id {
            TaskId::Images => (AssetCategory::Images, "Error Running images"),
            TaskId::Vendor => (AssetCategory::Vendor, "Error Running vendor"),
            TaskId::Fonts => (AssetCategory::Fonts, "Error Running fonts"),
            TaskId::Others => (AssetCategory::Others, "Error Running others"),
            _ => return None,
        };
        Some(Self { id, category, label })
    }
}

impl Transform for Copy {
    fn id(&self) -> TaskId {
        self.id
    }

    fn category(&self) -> AssetCategory {
        self.category
    }

    fn label(&self) -> &str {
        self.label
    }

    fn transform(&self, ctx: &BuildContext, source: &SourceFile) -> Result<Vec<Emitted>, AssetError> {
        let bytes = ctx
            .fs()
            .read(&source.path)
            .map_err(|e| AssetError::io(&source.path, &e))?;
        Ok(vec![Emitted::new(&source.rel, bytes)])
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::config::SiteConfig;
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::intercept::DesktopNotifier;
    use crate::tasks::run_transform;
    use crate::types::BuildMode;

    #[test]
    fn only_pass_through_tasks_copy() {
        assert!(Copy::for_task(TaskId::Fonts).is_some());
        assert!(Copy::for_task(TaskId::Js).is_none());
        assert!(Copy::for_task(TaskId::Clean).is_none());
    }

    #[test]
    fn copies_binary_files_into_category_output() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/images/icons/logo.png", vec![0x89, b'P', b'N', b'G', 0, 0xff]);
        let ctx = BuildContext::new(
            BuildMode::Production,
            SiteConfig::default(),
            "/site",
            Arc::new(fs.clone()),
            Arc::new(DesktopNotifier),
        );

        let copy = Copy::for_task(TaskId::Images).unwrap();
        let report = run_transform(&copy, &ctx).unwrap();

        assert_eq!(report.written, 1);
        let dest = ctx.output_dir(AssetCategory::Images).join("icons/logo.png");
        assert_eq!(fs.read(&dest).unwrap(), vec![0x89, b'P', b'N', b'G', 0, 0xff]);
        assert!(dest.starts_with(Path::new("/site")));
    }
}
