//! WASM bindings for lineage-narrative: outline a GEDCOM file in the browser.

use wasm_bindgen::prelude::*;

use lineage_narrative::core::pipeline::OutlineEngine;
use lineage_narrative::core::theme::ThemeRegistry;

// ---------------------------------------------------------------------------
// Embedded theme registry, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const DEFAULT_REGISTRY: &str = include_str!("../../theme_data/registry.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct ThemeInfo {
    name: String,
    priority: u32,
    blocks: Vec<String>,
}

#[derive(serde::Serialize)]
struct ErrorInfo {
    kind: String,
    message: String,
}

// ---------------------------------------------------------------------------
// LineageOutliner, the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct LineageOutliner {
    engine: OutlineEngine,
}

#[wasm_bindgen]
impl LineageOutliner {
    /// Create an outliner. `registry_ron` replaces the embedded registry
    /// when given. The reference year must come from the host: there is no
    /// reliable clock inside the module.
    #[wasm_bindgen(constructor)]
    pub fn new(registry_ron: Option<String>, reference_year: i32) -> Result<LineageOutliner, JsError> {
        let source = registry_ron.as_deref().unwrap_or(data::DEFAULT_REGISTRY);
        let registry = ThemeRegistry::parse_ron(source)
            .map_err(|e| JsError::new(&format!("Registry error: {e}")))?;
        let engine = OutlineEngine::builder()
            .with_registry(registry)
            .reference_year(reference_year)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        Ok(LineageOutliner { engine })
    }

    /// Outline raw GEDCOM bytes. Returns the outline as JSON.
    pub fn outline(&self, gedcom: &[u8]) -> Result<String, JsError> {
        let outline = self
            .engine
            .outline(gedcom)
            .map_err(|e| JsError::new(&error_json(&e)))?;
        outline
            .to_json()
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Outline GEDCOM text already decoded by the host.
    pub fn outline_text(&self, gedcom: &str) -> Result<String, JsError> {
        self.outline(gedcom.as_bytes())
    }

    /// Return a JSON array of themes in evaluation order.
    pub fn themes(&self) -> String {
        let themes: Vec<ThemeInfo> = self
            .engine
            .registry()
            .ranked()
            .map(|(_, t)| ThemeInfo {
                name: t.name.clone(),
                priority: t.priority,
                blocks: t.blocks.clone(),
            })
            .collect();
        serde_json::to_string(&themes).unwrap_or_else(|_| "[]".to_string())
    }

    /// Return the embedded registry source, for editing in the demo.
    pub fn default_registry() -> String {
        data::DEFAULT_REGISTRY.to_string()
    }
}

/// Errors cross the boundary as JSON so the page can tell a bad file from
/// a bad registry.
fn error_json(err: &lineage_narrative::PipelineError) -> String {
    let info = ErrorInfo {
        kind: format!("{:?}", err.kind()).to_lowercase(),
        message: err.to_string(),
    };
    serde_json::to_string(&info).unwrap_or_else(|_| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_is_valid() {
        let registry = ThemeRegistry::parse_ron(data::DEFAULT_REGISTRY).unwrap();
        assert!(!registry.default_blocks.is_empty());
    }

    #[test]
    fn error_json_names_the_kind() {
        let engine = OutlineEngine::builder()
            .with_registry(ThemeRegistry::parse_ron(data::DEFAULT_REGISTRY).unwrap())
            .reference_year(2024)
            .build()
            .unwrap();
        let err = engine.outline(b"0 HEAD\n").unwrap_err();
        let json = error_json(&err);
        assert!(json.contains("\"kind\":\"document\""));
    }
}
