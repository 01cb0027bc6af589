//! Typed async services over a [`DataStore`].
//!
//! One generic [`EntityService`] provides get/create/update/delete for every
//! entity; the per-entity queries live in the impl blocks below it.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::analytics::{self, AnalyticsOptions};
use crate::error::{CoachError, Result};
use crate::models::{Exercise, PlanPreferences, UserProfile, WorkoutLog, WorkoutPlan};
use crate::plan;
use crate::storage::{Collection, DataStore, Document};

/// A stored entity with a string identifier.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;
    /// Human name used in errors, e.g. "Workout log".
    const NAME: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// Adjust a new entity right before it is first stored.
    fn prepare_new(&mut self) {}
}

impl Entity for Exercise {
    const COLLECTION: Collection = Collection::Exercises;
    const NAME: &'static str = "Exercise";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Entity for UserProfile {
    const COLLECTION: Collection = Collection::Profiles;
    const NAME: &'static str = "User profile";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn prepare_new(&mut self) {
        self.current_streak = 0;
        self.total_workouts = 0;
    }
}

impl Entity for WorkoutLog {
    const COLLECTION: Collection = Collection::Logs;
    const NAME: &'static str = "Workout log";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Entity for WorkoutPlan {
    const COLLECTION: Collection = Collection::Plans;
    const NAME: &'static str = "Workout plan";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Operation kinds, for simulated latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    GetAll,
    Get,
    Recent,
    Range,
    Search,
    ByMuscle,
    Create,
    Update,
    Delete,
    Generate,
    Today,
}

/// Artificial delay before each service call, to mimic a remote API.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Latency {
    simulated: bool,
}

impl Latency {
    pub fn none() -> Self {
        Self { simulated: false }
    }

    pub fn simulated() -> Self {
        Self { simulated: true }
    }

    pub fn is_simulated(self) -> bool {
        self.simulated
    }

    pub fn delay(self, op: Op) -> Duration {
        if !self.simulated {
            return Duration::ZERO;
        }
        let ms = match op {
            Op::GetAll | Op::Range | Op::Create => 300,
            Op::Get | Op::Delete | Op::Search => 200,
            Op::Recent | Op::Update | Op::ByMuscle | Op::Today => 250,
            Op::Generate => 500,
        };
        Duration::from_millis(ms)
    }

    async fn wait(self, op: Op) {
        let d = self.delay(op);
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

pub struct EntityService<T, S> {
    store: Arc<S>,
    latency: Latency,
    _entity: PhantomData<fn() -> T>,
}

pub type ExerciseService<S> = EntityService<Exercise, S>;
pub type ProfileService<S> = EntityService<UserProfile, S>;
pub type LogService<S> = EntityService<WorkoutLog, S>;
pub type PlanService<S> = EntityService<WorkoutPlan, S>;

impl<T, S> Clone for EntityService<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            latency: self.latency,
            _entity: PhantomData,
        }
    }
}

fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(doc)?)
}

impl<T: Entity, S: DataStore> EntityService<T, S> {
    pub fn new(store: Arc<S>, latency: Latency) -> Self {
        Self {
            store,
            latency,
            _entity: PhantomData,
        }
    }

    async fn load_all(&self) -> Result<Vec<T>> {
        self.store
            .list(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn get_all(&self) -> Result<Vec<T>> {
        self.latency.wait(Op::GetAll).await;
        self.load_all().await
    }

    pub async fn get(&self, id: &str) -> Result<T> {
        self.latency.wait(Op::Get).await;
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => decode(doc),
            None => Err(CoachError::not_found(T::NAME, id)),
        }
    }

    /// Store a new entity under a fresh id. Any id on the input is replaced.
    pub async fn create(&self, mut entity: T) -> Result<T> {
        self.latency.wait(Op::Create).await;
        entity.set_id(Uuid::new_v4().to_string());
        entity.prepare_new();
        let doc = serde_json::to_value(&entity)?;
        self.store.insert(T::COLLECTION, entity.id(), doc).await?;
        debug!(collection = %T::COLLECTION, id = entity.id(), "created");
        Ok(entity)
    }

    /// Shallow-merge the fields of `partial` (a JSON object) into the entity.
    /// The merged result must still be a valid entity with the same id.
    pub async fn update(&self, id: &str, partial: Document) -> Result<T> {
        self.latency.wait(Op::Update).await;
        let Document::Object(fields) = partial else {
            return Err(CoachError::validation("update must be a JSON object"));
        };
        if fields.get("id").is_some_and(|v| v.as_str() != Some(id)) {
            return Err(CoachError::validation("the id of an entity cannot change"));
        }

        let Some(mut doc) = self.store.get(T::COLLECTION, id).await? else {
            return Err(CoachError::not_found(T::NAME, id));
        };
        let Some(target) = doc.as_object_mut() else {
            return Err(CoachError::validation(format!("stored {} `{id}` is not an object", T::NAME)));
        };
        target.extend(fields);

        let merged: T = serde_json::from_value(doc.clone())
            .map_err(|e| CoachError::validation(format!("invalid {} update: {e}", T::NAME)))?;
        if !self.store.replace(T::COLLECTION, id, doc).await? {
            return Err(CoachError::not_found(T::NAME, id));
        }
        debug!(collection = %T::COLLECTION, id, "updated");
        Ok(merged)
    }

    /// Typed whole-entity update; shorthand for `update` with every field.
    pub async fn save(&self, entity: &T) -> Result<T> {
        self.update(entity.id(), serde_json::to_value(entity)?).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.latency.wait(Op::Delete).await;
        if !self.store.remove(T::COLLECTION, id).await? {
            return Err(CoachError::not_found(T::NAME, id));
        }
        debug!(collection = %T::COLLECTION, id, "deleted");
        Ok(())
    }
}

impl<S: DataStore> EntityService<Exercise, S> {
    pub async fn get_by_muscle_group(&self, group: &str) -> Result<Vec<Exercise>> {
        self.latency.wait(Op::ByMuscle).await;
        let group = group.to_lowercase();
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|e| e.muscle_groups.iter().any(|m| m.to_lowercase() == group))
            .collect())
    }

    /// Case-insensitive substring match on name or any muscle group.
    pub async fn search(&self, query: &str) -> Result<Vec<Exercise>> {
        self.latency.wait(Op::Search).await;
        let term = query.to_lowercase();
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&term)
                    || e.muscle_groups.iter().any(|m| m.to_lowercase().contains(&term))
            })
            .collect())
    }
}

impl<S: DataStore> EntityService<UserProfile, S> {
    /// The first stored profile is the current user.
    pub async fn get_current(&self) -> Result<UserProfile> {
        self.latency.wait(Op::Get).await;
        self.load_all()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoachError::not_found(UserProfile::NAME, "current"))
    }

    /// Recompute the current profile's streak and workout total from the
    /// full log history and store them.
    pub async fn refresh_counters(
        &self,
        logs: &[WorkoutLog],
        now: DateTime<Utc>,
        opts: &AnalyticsOptions,
    ) -> Result<UserProfile> {
        let mut profile = self.get_current().await?;
        profile.current_streak = analytics::current_streak(logs, now, opts);
        profile.total_workouts = logs.iter().filter(|l| l.completed).count() as u32;
        debug!(
            streak = profile.current_streak,
            total = profile.total_workouts,
            "profile counters refreshed"
        );
        self.save(&profile).await
    }
}

impl<S: DataStore> EntityService<WorkoutLog, S> {
    pub const DEFAULT_RECENT: usize = 10;

    /// Newest first.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<WorkoutLog>> {
        self.latency.wait(Op::Recent).await;
        let mut logs = self.load_all().await?;
        logs.sort_by(|a, b| b.date.cmp(&a.date));
        logs.truncate(limit);
        Ok(logs)
    }

    /// Logs dated within `[start, end]`, both ends included.
    pub async fn get_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<WorkoutLog>> {
        self.latency.wait(Op::Range).await;
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|l| l.date >= start && l.date <= end)
            .collect())
    }
}

impl<S: DataStore> EntityService<WorkoutPlan, S> {
    pub async fn generate_plan(&self, prefs: &PlanPreferences, now: DateTime<Utc>) -> Result<WorkoutPlan> {
        self.latency.wait(Op::Generate).await;
        let plan = self.create(plan::generate(prefs, now)).await?;
        tracing::info!(plan = %plan.id, "generated plan");
        Ok(plan)
    }

    /// The plan created on `now`'s UTC day, or a freshly generated one.
    pub async fn get_today_plan(&self, prefs: &PlanPreferences, now: DateTime<Utc>) -> Result<WorkoutPlan> {
        self.latency.wait(Op::Today).await;
        let today = now.date_naive();
        let existing = self
            .load_all()
            .await?
            .into_iter()
            .find(|p| p.date.date_naive() == today);
        match existing {
            Some(plan) => Ok(plan),
            None => self.generate_plan(prefs, now).await,
        }
    }
}
