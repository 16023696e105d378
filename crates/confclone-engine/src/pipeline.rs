//! The clone-and-integrate protocol: four ordered phases driven by one
//! pipeline value. A failure in any phase aborts the run; each phase
//! persists its own artifacts at its end, so a failed run leaves at most the
//! already-completed phases applied and a re-run converges via cleanup.

use crate::index::{self, IndexSpec};
use crate::model::{CloneJob, CloneOutcome};
use crate::{ids, store, CloneError};
use confclone_xmltree::Document;
use std::path::PathBuf;
use tracing::{debug, info};

struct IndexTarget {
    path: PathBuf,
    spec: IndexSpec,
}

/// Holds the derived paths and the in-flight documents of one run.
pub struct ClonePipeline<'a> {
    job: &'a CloneJob,
    donor_path: PathBuf,
    clone_path: PathBuf,
    indexes: Vec<IndexTarget>,
}

impl CloneJob {
    /// Runs the whole protocol: cleanup, duplication + rewrite, identifier
    /// regeneration, index integration.
    pub fn run(&self) -> Result<CloneOutcome, CloneError> {
        ClonePipeline::new(self).run()
    }
}

impl<'a> ClonePipeline<'a> {
    pub fn new(job: &'a CloneJob) -> Self {
        let ns = &job.namespaces;
        ClonePipeline {
            donor_path: job.repo.definition_path(&job.donor.name),
            clone_path: job.repo.definition_path(&job.clone_name),
            indexes: vec![
                IndexTarget {
                    path: job.repo.structural_index_path(),
                    spec: IndexSpec::structural(ns, &job.donor.type_name),
                },
                IndexTarget {
                    path: job.repo.dump_index_path(),
                    spec: IndexSpec::dump_metadata(ns, &job.donor.type_name),
                },
            ],
            job,
        }
    }

    pub fn run(self) -> Result<CloneOutcome, CloneError> {
        let mut outcome = CloneOutcome {
            clone_path: self.clone_path.clone(),
            removed_stale_definition: false,
            removed_stale_records: 0,
            regenerated_ids: 0,
            indexes_updated: 0,
        };
        self.cleanup(&mut outcome)?;
        let rewritten = self.duplicate()?;
        self.regenerate(rewritten, &mut outcome)?;
        self.integrate(&mut outcome)?;
        info!(
            clone = %self.job.clone_ref().qualified_name(),
            ids = outcome.regenerated_ids,
            "clone-and-integrate complete"
        );
        Ok(outcome)
    }

    /// Phase 1 — idempotent cleanup: delete the clone's definition file and
    /// any registration record left by a prior run, persisting each index
    /// immediately. An index file missing on disk is tolerated here; phase 4
    /// still requires it.
    fn cleanup(&self, outcome: &mut CloneOutcome) -> Result<(), CloneError> {
        let clone_q = self.job.clone_ref().qualified_name();
        outcome.removed_stale_definition = store::delete_if_exists(&self.clone_path)?;
        if outcome.removed_stale_definition {
            info!(path = %self.clone_path.display(), "removed stale clone definition");
        }
        for target in &self.indexes {
            if !target.path.exists() {
                continue;
            }
            let mut doc = store::load(&target.path)?;
            if index::remove_record(&mut doc, &clone_q) {
                store::save(&doc, &target.path)?;
                outcome.removed_stale_records += 1;
                info!(index = %target.path.display(), record = %clone_q, "removed stale record");
            }
        }
        Ok(())
    }

    /// Phase 2 — duplication + textual rewrite. Pure: reads the donor's
    /// definition as raw text and applies the two-pattern substitution,
    /// touching nothing on disk.
    fn duplicate(&self) -> Result<String, CloneError> {
        let text = store::read_text(&self.donor_path)?;
        debug!(path = %self.donor_path.display(), bytes = text.len(), "read donor definition");
        Ok(rewrite_entity_names(
            &text,
            &self.job.donor.name,
            &self.job.clone_name,
        ))
    }

    /// Phase 3 — identifier regeneration: parse the rewritten text, give the
    /// root object and every `TypeId`/`ValueId` node a fresh identifier,
    /// persist to the clone's definition path.
    fn regenerate(&self, rewritten: String, outcome: &mut CloneOutcome) -> Result<(), CloneError> {
        let mut doc =
            Document::parse(&rewritten).map_err(|source| CloneError::MalformedArtifact {
                path: self.donor_path.clone(),
                source,
            })?;
        outcome.regenerated_ids = self.regenerate_ids(&mut doc)?;
        store::save_creating_dir(&doc, &self.clone_path)?;
        info!(
            path = %self.clone_path.display(),
            ids = outcome.regenerated_ids,
            "wrote clone definition"
        );
        Ok(())
    }

    fn regenerate_ids(&self, doc: &mut Document) -> Result<usize, CloneError> {
        let ns = &self.job.namespaces;
        let identity_attr = ns.identity_attr.clone();
        let type_id = ns.ext_name("TypeId");
        let value_id = ns.ext_name("ValueId");

        let mut identity = 0usize;
        let mut type_ids = 0usize;
        let mut value_ids = 0usize;
        doc.root.for_each_mut(&mut |el| {
            if identity == 0 && el.attr(&identity_attr).is_some() {
                el.set_attr(&identity_attr, ids::fresh());
                identity += 1;
            }
            if el.name == type_id {
                el.set_text(ids::fresh());
                type_ids += 1;
            } else if el.name == value_id {
                el.set_text(ids::fresh());
                value_ids += 1;
            }
        });

        for (count, role) in [
            (identity, identity_attr.as_str()),
            (type_ids, type_id.as_str()),
            (value_ids, value_id.as_str()),
        ] {
            if count == 0 {
                return Err(CloneError::MissingIdentifierNodes {
                    path: self.donor_path.clone(),
                    role: role.to_string(),
                });
            }
        }
        Ok(identity + type_ids + value_ids)
    }

    /// Phase 4 — topological integration: register the clone in each index,
    /// directly after the last record of its type.
    fn integrate(&self, outcome: &mut CloneOutcome) -> Result<(), CloneError> {
        let clone_q = self.job.clone_ref().qualified_name();
        for target in &self.indexes {
            let mut doc = store::load(&target.path)?;
            index::insert_after_last_of_type(
                &mut doc,
                &target.spec,
                target.spec.new_record(&clone_q),
            )
            .map_err(|source| CloneError::MalformedArtifact {
                path: target.path.clone(),
                source,
            })?;
            store::save(&doc, &target.path)?;
            outcome.indexes_updated += 1;
            info!(index = %target.path.display(), record = %clone_q, "registered clone");
        }
        Ok(())
    }
}

/// The two substitution rules of the duplication phase, case-sensitive and
/// nothing more: `.<Donor>` as a qualified-name path suffix and `><Donor><`
/// as a bare element text value. Other occurrences of the donor's name stay
/// byte-identical, which is what keeps the rewrite from corrupting content
/// the tool does not understand.
pub fn rewrite_entity_names(text: &str, donor: &str, clone: &str) -> String {
    text.replace(&format!(".{donor}"), &format!(".{clone}"))
        .replace(&format!(">{donor}<"), &format!(">{clone}<"))
}
