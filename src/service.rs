// src/service.rs
//! Import dispatcher: picks the converter, enforces the mode, reconciles
//! relations and installs the result into the host store.

use crate::converter::{Conversion, ConverterRegistry, ImportRequest, Progress, Response};
use crate::error::{AppError, ConvertError, ImportError};
use crate::model::SnapshotKind;
use crate::reconcile::{FileStore, ObjectStore, ReconcileReport, RelationReconciler};
use std::sync::Arc;

/// What the caller gets back: the (possibly partial) response and the
/// classified error, if any.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub response: Option<Response>,
    pub report: Option<ReconcileReport>,
    pub error: Option<ImportError>,
}

impl ImportOutcome {
    fn failed(errors: ConvertError) -> Self {
        Self {
            response: None,
            report: None,
            error: errors.result_error(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct ImportService {
    registry: ConverterRegistry,
    objects: Arc<dyn ObjectStore>,
    files: Arc<dyn FileStore>,
}

impl ImportService {
    pub fn new(
        registry: ConverterRegistry,
        objects: Arc<dyn ObjectStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            registry,
            objects,
            files,
        }
    }

    pub async fn import(&self, request: &ImportRequest, progress: &dyn Progress) -> ImportOutcome {
        let name = request.format.converter_name();
        let Some(converter) = self.registry.get(name) else {
            return ImportOutcome::failed(ConvertError::from_error(
                name,
                AppError::UnknownFormat(name.to_string()),
            ));
        };
        if let Err(cancelled) = progress.try_step(0) {
            return ImportOutcome::failed(ConvertError::from_error(name, cancelled));
        }

        log::info!("starting {} import ({:?})", name, request.mode);
        let Conversion {
            response,
            mut errors,
        } = converter.get_snapshots(request, progress).await;

        if errors.is_cancelled() || errors.should_abort(request.mode) {
            return ImportOutcome::failed(errors);
        }
        let Some(mut response) = response.filter(has_objects) else {
            if errors.is_empty() {
                errors.add(name, AppError::NoObjectsToImport);
            }
            return ImportOutcome::failed(errors);
        };

        let report = RelationReconciler::new(self.objects.as_ref(), self.files.as_ref())
            .reconcile(&mut response);

        for snapshot in &response.snapshots {
            if let Err(e) = self.objects.install(snapshot.clone()) {
                log::warn!("cannot install {}: {}", snapshot.id, e);
                errors.add(snapshot.id.to_string(), e);
            }
        }
        log::info!(
            "{} import finished: {} snapshots, {} failures",
            name,
            response.snapshots.len(),
            errors.len()
        );

        if errors.should_abort(request.mode) {
            return ImportOutcome {
                response: None,
                report: Some(report),
                error: errors.result_error(),
            };
        }
        ImportOutcome {
            response: Some(response),
            report: Some(report),
            error: errors.result_error(),
        }
    }
}

/// Whether a response holds anything besides the root collection.
fn has_objects(response: &Response) -> bool {
    response
        .snapshots
        .iter()
        .filter(|s| s.kind != SnapshotKind::SubObject)
        .count()
        > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{
        build_root_collection, Converter, ImportFormat, ImportMode, ProgressTracker,
    };
    use crate::model::Snapshot;
    use crate::reconcile::MemoryStore;
    use crate::types::ObjectId;

    /// Produces one page and optionally one failure.
    struct Fixed {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Converter for Fixed {
        fn name(&self) -> &'static str {
            "html"
        }

        async fn get_snapshots(&self, _: &ImportRequest, _: &dyn Progress) -> Conversion {
            let page = Snapshot::page(ObjectId::new(), "a.html");
            let root = build_root_collection("HTML Import", &[page.id.clone()]);
            let mut errors = ConvertError::new();
            if self.fail {
                errors.add("b.html", AppError::Parse {
                    path: "b.html".into(),
                    message: "broken".into(),
                });
            }
            Conversion::new(
                Response {
                    snapshots: vec![page, root],
                    ..Response::default()
                },
                errors,
            )
        }
    }

    fn service(fail: bool, store: &Arc<MemoryStore>) -> ImportService {
        ImportService::new(
            ConverterRegistry::new().register(Arc::new(Fixed { fail })),
            store.clone(),
            store.clone(),
        )
    }

    fn request(mode: ImportMode) -> ImportRequest {
        ImportRequest::paths(ImportFormat::Html, mode, vec!["a.html".into()])
    }

    #[tokio::test]
    async fn partial_results_survive_ignore_errors() {
        let store = Arc::new(MemoryStore::new());
        let outcome = service(true, &store)
            .import(&request(ImportMode::IgnoreErrors), &ProgressTracker::new())
            .await;
        assert_eq!(outcome.response.map(|r| r.snapshots.len()), Some(2));
        assert!(matches!(outcome.error, Some(ImportError::Failed(_))));
        assert_eq!(store.objects().len(), 2);
    }

    #[tokio::test]
    async fn all_or_nothing_drops_the_response() {
        let store = Arc::new(MemoryStore::new());
        let outcome = service(true, &store)
            .import(&request(ImportMode::AllOrNothing), &ProgressTracker::new())
            .await;
        assert!(outcome.response.is_none());
        assert!(store.objects().is_empty());
    }

    #[tokio::test]
    async fn cancelled_runs_report_cancellation() {
        let store = Arc::new(MemoryStore::new());
        let progress = ProgressTracker::new();
        progress.cancel();
        let outcome = service(false, &store)
            .import(&request(ImportMode::IgnoreErrors), &progress)
            .await;
        assert!(matches!(outcome.error, Some(ImportError::Cancelled)));
    }

    #[tokio::test]
    async fn unregistered_formats_fail() {
        let store = Arc::new(MemoryStore::new());
        let request = ImportRequest::paths(ImportFormat::Pb, ImportMode::IgnoreErrors, Vec::new());
        let outcome = service(false, &store)
            .import(&request, &ProgressTracker::new())
            .await;
        assert!(matches!(outcome.error, Some(ImportError::Failed(_))));
    }
}
