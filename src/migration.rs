//! One-time data migration between the legacy `oc_lettings_site` tables and the per-domain tables.
//!
//! A run copies every row of a domain's source tables into its target tables under the same id,
//! re-pointing relations at the target tables, and then drops the source tables. Copy and drop
//! share one unit of work: a failure at any point leaves the store as it was before the run.

use crate::error::{AppError, MigrationError};
use crate::model::Letting;
use crate::reporting::ErrorReporter;
use crate::schema::{
    LettingsSchema, ProfilesSchema, Table, LEGACY_LETTINGS, LEGACY_PROFILES, LETTINGS, PROFILES,
};
use crate::store::{RecordStore, Tables};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Lettings,
    Profiles,
}

impl FromStr for Domain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lettings" => Ok(Domain::Lettings),
            "profiles" => Ok(Domain::Profiles),
            _ => Err(AppError::BadRequest(format!(
                "invalid domain: {} (expected lettings or profiles)",
                s
            ))),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Lettings => "lettings",
            Domain::Profiles => "profiles",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Legacy tables into the domain's own tables.
    Forward,
    /// Domain tables back into rebuilt legacy tables.
    Reverse,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationPhase {
    NotStarted,
    Copying,
    Dropping,
    Done,
}

/// Source and target tables of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationPlan {
    Lettings { from: LettingsSchema, to: LettingsSchema },
    Profiles { from: ProfilesSchema, to: ProfilesSchema },
}

impl MigrationPlan {
    pub fn new(domain: Domain, direction: Direction) -> Self {
        match (domain, direction) {
            (Domain::Lettings, Direction::Forward) => MigrationPlan::Lettings {
                from: LEGACY_LETTINGS,
                to: LETTINGS,
            },
            (Domain::Lettings, Direction::Reverse) => MigrationPlan::Lettings {
                from: LETTINGS,
                to: LEGACY_LETTINGS,
            },
            (Domain::Profiles, Direction::Forward) => MigrationPlan::Profiles {
                from: LEGACY_PROFILES,
                to: PROFILES,
            },
            (Domain::Profiles, Direction::Reverse) => MigrationPlan::Profiles {
                from: PROFILES,
                to: LEGACY_PROFILES,
            },
        }
    }

    /// Source tables in drop order (referencing before referenced).
    fn drop_order(&self) -> Vec<Table> {
        match self {
            MigrationPlan::Lettings { from, .. } => vec![from.letting, from.address],
            MigrationPlan::Profiles { from, .. } => vec![from.profile],
        }
    }

    /// Target tables in creation order.
    fn target_tables(&self) -> Vec<Table> {
        match self {
            MigrationPlan::Lettings { to, .. } => to.tables().to_vec(),
            MigrationPlan::Profiles { to, .. } => to.tables().to_vec(),
        }
    }
}

/// Rows copied per table and tables dropped by a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub domain: Domain,
    pub direction: Direction,
    pub copied: Vec<(String, usize)>,
    pub dropped: Vec<String>,
}

fn copy_failed(table: Table) -> impl FnOnce(AppError) -> MigrationError {
    move |source| MigrationError::Copy {
        table: table.name(),
        source,
    }
}

/// Copy every address, then every letting, from `from` into `to`. Ids are kept; each letting is
/// attached to the address with the same id in `to`, which must already hold it.
pub async fn copy_lettings<T: Tables + ?Sized>(
    tables: &mut T,
    from: &LettingsSchema,
    to: &LettingsSchema,
) -> Result<Vec<(Table, usize)>, MigrationError> {
    let addresses = tables
        .list_addresses(from)
        .await
        .map_err(copy_failed(from.address))?;
    for address in &addresses {
        tables
            .insert_address(to, address)
            .await
            .map_err(copy_failed(to.address))?;
    }

    let lettings = tables
        .list_lettings(from)
        .await
        .map_err(copy_failed(from.letting))?;
    for letting in &lettings {
        let address = tables
            .find_address(to, letting.address_id)
            .await
            .map_err(copy_failed(to.address))?
            .ok_or_else(|| {
                copy_failed(to.letting)(AppError::Reference(format!(
                    "letting {} refers to address {} missing from {}",
                    letting.id, letting.address_id, to.address
                )))
            })?;
        let copy = Letting {
            id: letting.id,
            title: letting.title.clone(),
            address_id: address.id,
        };
        tables
            .insert_letting(to, &copy)
            .await
            .map_err(copy_failed(to.letting))?;
    }

    Ok(vec![(to.address, addresses.len()), (to.letting, lettings.len())])
}

/// Copy every profile from `from` into `to`, keeping id, favorite city and user id.
/// Users themselves stay where they are.
pub async fn copy_profiles<T: Tables + ?Sized>(
    tables: &mut T,
    from: &ProfilesSchema,
    to: &ProfilesSchema,
) -> Result<Vec<(Table, usize)>, MigrationError> {
    let profiles = tables
        .list_profiles(from)
        .await
        .map_err(copy_failed(from.profile))?;
    for profile in &profiles {
        tables
            .insert_profile(to, profile)
            .await
            .map_err(copy_failed(to.profile))?;
    }
    Ok(vec![(to.profile, profiles.len())])
}

/// A single migration run. Not reusable: after `run` the phase is either `Done` or the phase it
/// failed in.
pub struct Migration<'a> {
    store: &'a dyn RecordStore,
    reporter: &'a dyn ErrorReporter,
    domain: Domain,
    direction: Direction,
    plan: MigrationPlan,
    phase: MigrationPhase,
}

impl<'a> Migration<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        reporter: &'a dyn ErrorReporter,
        domain: Domain,
        direction: Direction,
    ) -> Self {
        Migration {
            store,
            reporter,
            domain,
            direction,
            plan: MigrationPlan::new(domain, direction),
            phase: MigrationPhase::NotStarted,
        }
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    fn enter(&mut self, phase: MigrationPhase) {
        tracing::info!(
            domain = %self.domain,
            direction = ?self.direction,
            from = ?self.phase,
            to = ?phase,
            "migration phase"
        );
        self.phase = phase;
    }

    pub async fn run(&mut self) -> Result<MigrationReport, MigrationError> {
        if self.phase != MigrationPhase::NotStarted {
            return Err(MigrationError::Store(AppError::BadRequest(
                "migration already ran".into(),
            )));
        }
        let result = self.execute().await;
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    async fn execute(&mut self) -> Result<MigrationReport, MigrationError> {
        let mut uow = self.store.begin().await?;

        self.enter(MigrationPhase::Copying);
        for table in self.plan.target_tables() {
            uow.create_table(table).await.map_err(copy_failed(table))?;
        }
        let copied = match &self.plan {
            MigrationPlan::Lettings { from, to } => copy_lettings(&mut *uow, from, to).await?,
            MigrationPlan::Profiles { from, to } => copy_profiles(&mut *uow, from, to).await?,
        };

        self.enter(MigrationPhase::Dropping);
        let mut dropped = Vec::new();
        for table in self.plan.drop_order() {
            uow.drop_table(table)
                .await
                .map_err(|source| MigrationError::Drop {
                    table: table.name(),
                    source,
                })?;
            dropped.push(table.name());
        }

        uow.commit().await?;
        self.enter(MigrationPhase::Done);

        Ok(MigrationReport {
            domain: self.domain,
            direction: self.direction,
            copied: copied
                .into_iter()
                .map(|(table, rows)| (table.name(), rows))
                .collect(),
            dropped,
        })
    }

    fn report(&self, err: &MigrationError) {
        tracing::error!(
            domain = %self.domain,
            direction = ?self.direction,
            phase = ?self.phase,
            error = %err,
            "migration failed"
        );
        match err {
            MigrationError::Copy {
                source: AppError::Validation(invalid),
                ..
            } => self
                .reporter
                .report_error(invalid, &format!("validation error in model {}", invalid.model)),
            other => self.reporter.report_error(
                other,
                &format!("{:?} migration of {} failed", self.direction, self.domain),
            ),
        }
    }
}

pub async fn migrate_forward(
    store: &dyn RecordStore,
    reporter: &dyn ErrorReporter,
    domain: Domain,
) -> Result<MigrationReport, MigrationError> {
    Migration::new(store, reporter, domain, Direction::Forward).run().await
}

pub async fn migrate_reverse(
    store: &dyn RecordStore,
    reporter: &dyn ErrorReporter,
    domain: Domain,
) -> Result<MigrationReport, MigrationError> {
    Migration::new(store, reporter, domain, Direction::Reverse).run().await
}
