//! Initial backup guarantee
//!
//! Recovery windows are anchored at successful backups, so a Pitr is only
//! meaningful once its current incarnation has one. The ensurer creates that
//! first backup and retries it if it fails.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, ObjectMeta, PostParams};
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info};

use oradb_common::crd::{Backup, BackupPhase, BackupSpec, BackupType, Pitr};
use oradb_common::events::{actions, reasons, EventPublisher};
use oradb_common::{Error, INCARNATION_LABEL, INSTANCE_LABEL, PITR_LABEL};

/// Backup sub-type used for the initial backup
pub const INITIAL_BACKUP_SUB_TYPE: &str = "Instance";

/// Access to Backup resources
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// List Backups in `namespace` matching a label selector
    async fn list_backups(&self, namespace: &str, selector: &str) -> Result<Vec<Backup>, Error>;

    /// Create a Backup; an existing Backup of the same name is not an error
    async fn create_backup(&self, namespace: &str, backup: &Backup) -> Result<(), Error>;

    /// Delete a Backup; a missing Backup is not an error
    async fn delete_backup(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// [`BackupStore`] backed by the API server
pub struct KubeBackupStore {
    client: Client,
}

impl KubeBackupStore {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackupStore for KubeBackupStore {
    async fn list_backups(&self, namespace: &str, selector: &str) -> Result<Vec<Backup>, Error> {
        let api: Api<Backup> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default().labels(selector)).await?;
        Ok(list.items)
    }

    async fn create_backup(&self, namespace: &str, backup: &Backup) -> Result<(), Error> {
        let api: Api<Backup> = Api::namespaced(self.client.clone(), namespace);
        match api.create(&PostParams::default(), backup).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_backup(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Backup> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What the Pitr reconcile should do after the ensurer ran
#[derive(Clone, Debug, PartialEq)]
pub enum EnsureOutcome {
    /// At least one backup has left the initial state; these are the
    /// backups of the current incarnation
    Proceed(Vec<Backup>),
    /// Come back after the given delay
    Requeue(Duration),
}

/// Label selector for backups taken for `pitr`, optionally narrowed to one
/// incarnation
pub fn backup_selector(pitr: &str, incarnation: Option<&str>) -> String {
    match incarnation {
        Some(inc) => format!("{PITR_LABEL}={pitr},{INCARNATION_LABEL}={inc}"),
        None => format!("{PITR_LABEL}={pitr}"),
    }
}

/// Name of the initial backup for one incarnation
pub fn initial_backup_name(pitr: &str, incarnation: &str) -> String {
    format!("{pitr}-{incarnation}-initial")
}

/// Build the initial backup for `pitr` and `incarnation`
pub fn initial_backup(pitr: &Pitr, incarnation: &str) -> Backup {
    let name = pitr.name_any();
    let labels = BTreeMap::from([
        (PITR_LABEL.to_string(), name.clone()),
        (INCARNATION_LABEL.to_string(), incarnation.to_string()),
        (INSTANCE_LABEL.to_string(), pitr.spec.instance_ref.clone()),
    ]);
    Backup {
        metadata: ObjectMeta {
            name: Some(initial_backup_name(&name, incarnation)),
            namespace: pitr.namespace(),
            labels: Some(labels),
            owner_references: pitr.controller_owner_ref(&()).map(|o| vec![o]),
            ..Default::default()
        },
        spec: BackupSpec {
            instance: pitr.spec.instance_ref.clone(),
            type_: BackupType::Physical,
            sub_type: Some(INITIAL_BACKUP_SUB_TYPE.to_string()),
            storage_uri: Some(pitr.spec.storage_uri.clone()),
        },
        status: None,
    }
}

/// Make sure the current incarnation has, or is getting, a backup
///
/// - no backups: create the initial one and wait
/// - a single failed backup: delete it so the next pass recreates it
/// - a single pending or running backup: wait
/// - anything else: proceed with the listed backups
pub async fn ensure_initial_backup(
    store: &dyn BackupStore,
    events: &dyn EventPublisher,
    pitr: &Pitr,
    namespace: &str,
    incarnation: &str,
    wait: Duration,
) -> Result<EnsureOutcome, Error> {
    let name = pitr.name_any();
    let selector = backup_selector(&name, Some(incarnation));
    let backups = store.list_backups(namespace, &selector).await?;

    match backups.as_slice() {
        [] => {
            let backup = initial_backup(pitr, incarnation);
            let backup_name = backup.name_any();
            store.create_backup(namespace, &backup).await?;
            info!(pitr = %name, backup = %backup_name, incarnation, "created initial backup");
            events
                .publish(
                    &pitr.object_ref(&()),
                    EventType::Normal,
                    reasons::INITIAL_BACKUP_CREATED,
                    actions::BACKUP,
                    Some(format!("Created backup {backup_name} for incarnation {incarnation}")),
                )
                .await;
            Ok(EnsureOutcome::Requeue(wait))
        }
        [only] if only.phase() == BackupPhase::Failed => {
            let backup_name = only.name_any();
            store.delete_backup(namespace, &backup_name).await?;
            info!(pitr = %name, backup = %backup_name, "deleted failed initial backup");
            events
                .publish(
                    &pitr.object_ref(&()),
                    EventType::Warning,
                    reasons::INITIAL_BACKUP_RETRIED,
                    actions::BACKUP,
                    Some(format!("Backup {backup_name} failed, recreating")),
                )
                .await;
            Ok(EnsureOutcome::Requeue(Duration::ZERO))
        }
        [only] if !only.phase().is_terminal() => {
            debug!(pitr = %name, backup = %only.name_any(), phase = %only.phase(), "initial backup not finished");
            Ok(EnsureOutcome::Requeue(wait))
        }
        _ => Ok(EnsureOutcome::Proceed(backups)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use oradb_common::crd::{BackupStatus, PitrSpec};
    use oradb_common::events::RecordingEventPublisher;
    use rstest::rstest;

    const WAIT: Duration = Duration::from_secs(30);

    fn pitr() -> Pitr {
        Pitr {
            metadata: ObjectMeta {
                name: Some("mypitr".into()),
                namespace: Some("db".into()),
                uid: Some("pitr-uid".into()),
                ..Default::default()
            },
            spec: PitrSpec {
                instance_ref: "mydb".into(),
                storage_uri: "gs://bucket/pitr".into(),
                backup_schedule: "0 */4 * * *".into(),
                recovery_window: "7d".into(),
            },
            status: None,
        }
    }

    fn backup(name: &str, phase: BackupPhase) -> Backup {
        let mut b = initial_backup(&pitr(), "1");
        b.metadata.name = Some(name.into());
        b.status = Some(BackupStatus {
            phase,
            ..Default::default()
        });
        b
    }

    fn store_listing(backups: Vec<Backup>) -> MockBackupStore {
        let mut store = MockBackupStore::new();
        store
            .expect_list_backups()
            .with(eq("db"), eq("oradb.dev/pitr=mypitr,oradb.dev/incarnation=1"))
            .returning(move |_, _| Ok(backups.clone()));
        store
    }

    /// Story: a brand new Pitr gets an initial backup named after the
    /// incarnation, owned by the Pitr
    #[tokio::test]
    async fn story_first_pass_creates_initial_backup() {
        let mut store = store_listing(vec![]);
        store
            .expect_create_backup()
            .withf(|ns, b| {
                ns == "db"
                    && b.name_any() == "mypitr-1-initial"
                    && b.labels().get(PITR_LABEL).map(String::as_str) == Some("mypitr")
                    && b.labels().get(INCARNATION_LABEL).map(String::as_str) == Some("1")
                    && b.owner_references().len() == 1
                    && b.spec.storage_uri.as_deref() == Some("gs://bucket/pitr")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_delete_backup().never();
        let events = RecordingEventPublisher::default();

        let outcome = ensure_initial_backup(&store, &events, &pitr(), "db", "1", WAIT)
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Requeue(WAIT));
        assert_eq!(events.reasons(), vec![reasons::INITIAL_BACKUP_CREATED]);
    }

    /// Story: a failed initial backup is deleted and the Pitr comes straight
    /// back to recreate it
    #[tokio::test]
    async fn story_failed_initial_backup_is_retried() {
        let mut store = store_listing(vec![backup("mypitr-1-initial", BackupPhase::Failed)]);
        store
            .expect_delete_backup()
            .with(eq("db"), eq("mypitr-1-initial"))
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_create_backup().never();
        let events = RecordingEventPublisher::default();

        let outcome = ensure_initial_backup(&store, &events, &pitr(), "db", "1", WAIT)
            .await
            .unwrap();

        assert_eq!(outcome, EnsureOutcome::Requeue(Duration::ZERO));
        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].warning);
        assert_eq!(recorded[0].reason, reasons::INITIAL_BACKUP_RETRIED);
    }

    #[rstest]
    #[case(BackupPhase::Pending)]
    #[case(BackupPhase::InProgress)]
    #[tokio::test]
    async fn unfinished_initial_backup_waits(#[case] phase: BackupPhase) {
        let mut store = store_listing(vec![backup("mypitr-1-initial", phase)]);
        store.expect_create_backup().never();
        store.expect_delete_backup().never();

        let outcome = ensure_initial_backup(
            &store,
            &RecordingEventPublisher::default(),
            &pitr(),
            "db",
            "1",
            WAIT,
        )
        .await
        .unwrap();

        assert_eq!(outcome, EnsureOutcome::Requeue(WAIT));
    }

    #[tokio::test]
    async fn succeeded_backup_proceeds() {
        let listed = vec![backup("mypitr-1-initial", BackupPhase::Succeeded)];
        let store = store_listing(listed.clone());

        let outcome = ensure_initial_backup(
            &store,
            &RecordingEventPublisher::default(),
            &pitr(),
            "db",
            "1",
            WAIT,
        )
        .await
        .unwrap();

        assert_eq!(outcome, EnsureOutcome::Proceed(listed));
    }

    #[tokio::test]
    async fn several_backups_proceed_even_if_one_failed() {
        let listed = vec![
            backup("a", BackupPhase::Failed),
            backup("b", BackupPhase::InProgress),
        ];
        let mut store = store_listing(listed.clone());
        store.expect_delete_backup().never();

        let outcome = ensure_initial_backup(
            &store,
            &RecordingEventPublisher::default(),
            &pitr(),
            "db",
            "1",
            WAIT,
        )
        .await
        .unwrap();

        assert_eq!(outcome, EnsureOutcome::Proceed(listed));
    }

    #[tokio::test]
    async fn list_failure_propagates() {
        let mut store = MockBackupStore::new();
        store
            .expect_list_backups()
            .returning(|_, _| Err(Error::internal("list failed")));

        let result = ensure_initial_backup(
            &store,
            &RecordingEventPublisher::default(),
            &pitr(),
            "db",
            "1",
            WAIT,
        )
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn selectors() {
        assert_eq!(backup_selector("p", None), "oradb.dev/pitr=p");
        assert_eq!(
            backup_selector("p", Some("2")),
            "oradb.dev/pitr=p,oradb.dev/incarnation=2"
        );
    }
}
