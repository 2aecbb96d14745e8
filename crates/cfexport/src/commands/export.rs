use anyhow::{Context, Result};
use export_core::{EntityKind, ExportError, ExportSummary, Exporter};
use tracing::info;

/// What a single export command asked for
#[derive(Debug, Clone, Copy)]
pub enum ExportTarget<'a> {
    Spaces(&'a [String]),
    Pages(&'a [u64]),
    PageTrees(&'a [u64]),
}

/// Export every requested target, merging their summaries
///
/// A target whose space or root page cannot be read is recorded as a failure
/// and the remaining targets still run. Errors that would hit every target
/// the same way (unwritable output directory) abort the command.
pub fn handle_export(exporter: &Exporter<'_>, target: ExportTarget<'_>) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();

    match target {
        ExportTarget::Spaces(keys) => {
            for key in keys {
                let result = exporter.export_space(key);
                if !absorb(&mut summary, EntityKind::Space, key, result)
                    .with_context(|| format!("Failed to export space {}", key))?
                {
                    break;
                }
            }
        }
        ExportTarget::Pages(ids) => {
            for id in ids {
                let result = exporter.export_page(*id);
                if !absorb(&mut summary, EntityKind::Page, &id.to_string(), result)
                    .with_context(|| format!("Failed to export page {}", id))?
                {
                    break;
                }
            }
        }
        ExportTarget::PageTrees(ids) => {
            for id in ids {
                let result = exporter.export_page_tree(*id);
                if !absorb(&mut summary, EntityKind::Page, &id.to_string(), result)
                    .with_context(|| format!("Failed to export page tree {}", id))?
                {
                    break;
                }
            }
        }
    }

    Ok(summary)
}

/// Fold one target's result into `summary`; `Ok(false)` stops the command
fn absorb(
    summary: &mut ExportSummary,
    kind: EntityKind,
    id: &str,
    result: export_core::Result<ExportSummary>,
) -> std::result::Result<bool, ExportError> {
    match result {
        Ok(run) => {
            info!(%kind, id, pages = run.pages_exported, "target done");
            summary.merge(run);
            Ok(!summary.cancelled)
        }
        Err(e) if e.is_transport() || matches!(e, ExportError::Structure(_)) => {
            summary.push_failure(kind, id, None, &e);
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_recorded() {
        let mut summary = ExportSummary::default();
        let keep_going = absorb(
            &mut summary,
            EntityKind::Space,
            "NOPE",
            Err(ExportError::NotFound("space NOPE".to_string())),
        )
        .unwrap();

        assert!(keep_going);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, EntityKind::Space);
        assert_eq!(summary.failures[0].id, "NOPE");
    }

    #[test]
    fn io_errors_abort() {
        let mut summary = ExportSummary::default();
        let err = absorb(
            &mut summary,
            EntityKind::Page,
            "1",
            Err(ExportError::Io("read-only".to_string())),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn cancellation_stops_remaining_targets() {
        let mut summary = ExportSummary::default();
        let run = ExportSummary {
            pages_exported: 2,
            cancelled: true,
            ..Default::default()
        };
        assert!(!absorb(&mut summary, EntityKind::Page, "1", Ok(run)).unwrap());
        assert_eq!(summary.pages_exported, 2);
    }
}
