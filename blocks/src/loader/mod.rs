pub mod error;
pub mod source_map;

use std::collections::HashSet;

use tracing::debug;

pub use error::LoadError;
pub use source_map::SourceMap;

use crate::Program;
use crate::block::Slot;

/// Loader entry point: turns program JSON into a validated [`Program`].
pub struct Loader {
    source: String,
    file_id: usize,
}

impl Loader {
    pub fn new(source: String, file_id: usize) -> Self {
        Loader { source, file_id }
    }

    pub fn load(&self) -> Result<Program, Vec<LoadError>> {
        let mut program: Program = serde_json::from_str(&self.source)
            .map_err(|e| vec![LoadError::from_json(&e, &self.source, self.file_id)])?;
        program.source_id = self.file_id;

        let errors = self.check_unique_ids(&program)?;
        if !errors.is_empty() {
            return Err(errors);
        }
        debug!(
            workspaces = program.workspaces.len(),
            variables = program.variables.len(),
            functions = program.functions.len(),
            "program loaded"
        );
        Ok(program)
    }

    /// Block identity must be unique across the whole document.
    fn check_unique_ids(&self, program: &Program) -> Result<Vec<LoadError>, Vec<LoadError>> {
        let map = SourceMap::new(&self.source).map_err(|e| {
            vec![LoadError::error(
                format!("cannot index block ids: {}", e),
                0..0,
                self.file_id,
            )]
        })?;

        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        let roots = program
            .workspaces
            .iter()
            .flat_map(|w| w.blocks.iter())
            .chain(program.functions.iter().flat_map(|f| {
                f.body
                    .iter()
                    .chain(f.returns.as_ref().and_then(Slot::as_block))
            }));
        for block in roots {
            block.visit_ids(&mut |id| {
                if !seen.insert(id.to_string()) {
                    duplicates.push(id.to_string());
                }
            });
        }

        let mut reported = HashSet::new();
        let errors = duplicates
            .into_iter()
            .filter(|id| reported.insert(id.clone()))
            .map(|id| {
                let occurrences = map.occurrences(&id);
                let span = occurrences
                    .get(1)
                    .or_else(|| occurrences.first())
                    .cloned()
                    .unwrap_or(0..0);
                LoadError::error(format!("duplicate block id '{}'", id), span, self.file_id)
                    .with_note("every block needs its own id")
            })
            .collect();
        Ok(errors)
    }
}
