//! Starter scaffold for new components

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

const WMCONFIG_JSON: &str = include_str!("templates/wmconfig.json");
const INDEX_TS: &str = include_str!("templates/index.ts");
const TYPES_TS: &str = include_str!("templates/types.ts");
const ICON_SVG: &str = include_str!("templates/icon.svg");
const DEMO_TSX: &str = include_str!("templates/demo.tsx");
const README_MD: &str = include_str!("templates/README.md");

/// Ordered steps for turning the scaffold into a publishable component
pub const TEMPLATE_INSTRUCTIONS: &[&str] = &[
    "1. Create a new directory for your WMX React Native component",
    "2. Create the required files: index.ts, wmconfig.json, icon.svg",
    "3. Customize wmconfig.json with your component details",
    "4. Implement your component logic in index.ts using React Native",
    "5. Define TypeScript types in types.ts",
    "6. Create demo examples in demo.tsx",
    "7. Design your component icon in icon.svg",
    "8. Add documentation in README.md",
    "9. Use validate to check if ready for publishing",
];

/// One file of the scaffold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateFile {
    pub path: &'static str,
    /// Field of [`PublishingTemplate`] holding the content
    pub content_key: &'static str,
    pub description: &'static str,
}

/// Static scaffold served by `get_publishing_template`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishingTemplate {
    pub wmconfig_json: serde_json::Value,
    pub index_ts_template: &'static str,
    pub types_ts_template: &'static str,
    pub icon_svg_template: &'static str,
    pub demo_tsx_template: &'static str,
    pub readme_template: &'static str,
    pub files_to_create: Vec<TemplateFile>,
    pub recommended_files: Vec<&'static str>,
}

impl PublishingTemplate {
    pub fn new() -> Result<Self> {
        let wmconfig_json =
            serde_json::from_str(WMCONFIG_JSON).context("Bundled wmconfig.json template is invalid")?;

        Ok(Self {
            wmconfig_json,
            index_ts_template: INDEX_TS,
            types_ts_template: TYPES_TS,
            icon_svg_template: ICON_SVG,
            demo_tsx_template: DEMO_TSX,
            readme_template: README_MD,
            files_to_create: vec![
                TemplateFile {
                    path: "wmconfig.json",
                    content_key: "wmconfig_json",
                    description: "WMX component configuration file",
                },
                TemplateFile {
                    path: "index.ts",
                    content_key: "index_ts_template",
                    description: "Component entry file (React Native implementation)",
                },
                TemplateFile {
                    path: "icon.svg",
                    content_key: "icon_svg_template",
                    description: "Component icon (SVG format)",
                },
                TemplateFile {
                    path: "types.ts",
                    content_key: "types_ts_template",
                    description: "TypeScript type definitions",
                },
                TemplateFile {
                    path: "demo.tsx",
                    content_key: "demo_tsx_template",
                    description: "Component demo and usage examples",
                },
                TemplateFile {
                    path: "README.md",
                    content_key: "readme_template",
                    description: "Component documentation",
                },
            ],
            recommended_files: vec![
                "CHANGELOG.md - Version history",
                "LICENSE - License file",
                "package.json - NPM dependencies (if needed)",
                "__tests__/ - Unit tests directory",
                ".eslintrc.js - ESLint configuration for code quality",
            ],
        })
    }

    fn content_for(&self, file: &TemplateFile) -> &'static str {
        match file.content_key {
            "wmconfig_json" => WMCONFIG_JSON,
            "index_ts_template" => self.index_ts_template,
            "types_ts_template" => self.types_ts_template,
            "icon_svg_template" => self.icon_svg_template,
            "demo_tsx_template" => self.demo_tsx_template,
            _ => self.readme_template,
        }
    }

    /// Write every scaffold file into `dir`, creating it if needed
    ///
    /// Refuses to touch a directory that already holds any scaffold file.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if let Some(existing) = self
            .files_to_create
            .iter()
            .map(|f| dir.join(f.path))
            .find(|p| p.exists())
        {
            anyhow::bail!("Refusing to overwrite existing file: {}", existing.display());
        }

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut written = Vec::with_capacity(self.files_to_create.len());
        for file in &self.files_to_create {
            let path = dir.join(file.path);
            std::fs::write(&path, self.content_for(file))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }

        tracing::info!("Scaffolded component template in {}", dir.display());
        Ok(written)
    }
}
