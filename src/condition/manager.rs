// SPDX-License-Identifier: MIT

//! Owner of a condition tree and its connection to the event stream.

use super::registry::{EventBus, SubscriptionId};
use super::serialization;
use super::{
    AndCondition, Condition, ConditionContext, ConditionKind, ConditionNode, OrCondition,
};
use crate::runtime::config::{EngineConfig, VersionPolicy};
use crate::runtime::error::SerializationError;
use crate::runtime::event::{EventSink, GameEvent};
use crate::runtime::world::WorldView;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Root combinator of a managed tree
#[derive(Debug, Clone)]
enum Root {
    All(AndCondition),
    Any(OrCondition),
}

impl Root {
    fn from_node(node: ConditionNode) -> Self {
        match node {
            ConditionNode::And(and) => Root::All(and),
            ConditionNode::Or(or) => Root::Any(or),
            other => Root::All(AndCondition::with(vec![other])),
        }
    }

    fn into_node(self) -> ConditionNode {
        match self {
            Root::All(and) => and.into(),
            Root::Any(or) => or.into(),
        }
    }

    fn kind(&self) -> ConditionKind {
        self.as_condition().kind()
    }

    fn as_condition(&self) -> &dyn Condition {
        match self {
            Root::All(and) => and,
            Root::Any(or) => or,
        }
    }

    fn as_condition_mut(&mut self) -> &mut dyn Condition {
        match self {
            Root::All(and) => and,
            Root::Any(or) => or,
        }
    }

    fn children(&self) -> &[ConditionNode] {
        match self {
            Root::All(and) => and.conditions(),
            Root::Any(or) => or.conditions(),
        }
    }

    fn children_mut(&mut self) -> &mut [ConditionNode] {
        match self {
            Root::All(and) => and.conditions_mut(),
            Root::Any(or) => or.conditions_mut(),
        }
    }

    fn take_children(&mut self) -> Vec<ConditionNode> {
        match std::mem::replace(self, Root::All(AndCondition::new())) {
            Root::All(and) => and.into_conditions(),
            Root::Any(or) => or.into_conditions(),
        }
    }

    fn push(&mut self, node: ConditionNode) {
        match self {
            Root::All(and) => {
                and.add(node);
            }
            Root::Any(or) => {
                or.add(node);
            }
        }
    }

    fn remove(&mut self, index: usize) -> Option<ConditionNode> {
        match self {
            Root::All(and) => and.remove(index),
            Root::Any(or) => or.remove(index),
        }
    }
}

/// Owns one condition tree and answers whether it is met.
///
/// Conditions added directly become children of a root combinator (AND by
/// default, OR after [`require_any`](Self::require_any)). Events enter only
/// through the root, so each node sees each event exactly once.
pub struct ConditionManager {
    root: Option<Root>,
    world: Arc<dyn WorldView>,
    rng: ChaCha8Rng,
    policy: VersionPolicy,
    active: bool,
    paused_at: Option<DateTime<Local>>,
}

impl ConditionManager {
    pub fn new(world: Arc<dyn WorldView>) -> Self {
        Self::with_config(world, &EngineConfig::default())
    }

    pub fn with_config(world: Arc<dyn WorldView>, config: &EngineConfig) -> Self {
        Self {
            root: None,
            world,
            rng: config.rng(),
            policy: config.version_policy,
            active: false,
            paused_at: None,
        }
    }

    pub fn world(&self) -> &Arc<dyn WorldView> {
        &self.world
    }

    /// Context for building leaves against this manager's world and RNG
    pub fn context(&mut self) -> ConditionContext<'_> {
        ConditionContext::new(self.world.as_ref(), &mut self.rng)
    }

    pub fn add_condition(&mut self, condition: impl Into<ConditionNode>) -> &mut Self {
        let mut node = condition.into();
        if self.active {
            node.activate(self.world.as_ref());
        }
        self.root
            .get_or_insert_with(|| Root::All(AndCondition::new()))
            .push(node);
        self
    }

    pub fn remove_condition(&mut self, index: usize) -> Option<ConditionNode> {
        self.root.as_mut().and_then(|root| root.remove(index))
    }

    /// Replace the tree. Anything but AND/OR is wrapped in an AND.
    pub fn set_root(&mut self, node: impl Into<ConditionNode>) {
        let mut root = Root::from_node(node.into());
        if self.active {
            root.as_condition_mut().activate(self.world.as_ref());
        }
        self.root = Some(root);
    }

    pub fn clear(&mut self) {
        if let Some(root) = self.root.as_mut() {
            root.as_condition_mut().deactivate();
        }
        self.root = None;
    }

    pub fn into_root(self) -> Option<ConditionNode> {
        self.root.map(Root::into_node)
    }

    /// Every condition must hold. Existing conditions are kept.
    pub fn require_all(&mut self) {
        let children = match self.root.as_mut() {
            Some(Root::All(_)) => return,
            Some(root) => root.take_children(),
            None => Vec::new(),
        };
        self.root = Some(Root::All(AndCondition::with(children)));
    }

    /// Any single condition is enough. Existing conditions are kept.
    pub fn require_any(&mut self) {
        let children = match self.root.as_mut() {
            Some(Root::Any(_)) => return,
            Some(root) => root.take_children(),
            None => Vec::new(),
        };
        self.root = Some(Root::Any(OrCondition::with(children)));
    }

    pub fn requires_all(&self) -> bool {
        !matches!(self.root, Some(Root::Any(_)))
    }

    pub fn root_kind(&self) -> ConditionKind {
        self.root
            .as_ref()
            .map(Root::kind)
            .unwrap_or(ConditionKind::And)
    }

    /// Directly added conditions, in insertion order
    pub fn conditions(&self) -> &[ConditionNode] {
        self.root.as_ref().map(Root::children).unwrap_or(&[])
    }

    pub fn has_conditions(&self) -> bool {
        !self.conditions().is_empty()
    }

    /// True when there are no conditions; false while paused.
    pub fn are_conditions_met(&self) -> bool {
        self.are_conditions_met_at(Local::now())
    }

    pub fn are_conditions_met_at(&self, now: DateTime<Local>) -> bool {
        if self.is_paused() {
            return false;
        }
        match &self.root {
            Some(root) if !root.children().is_empty() => root.as_condition().is_met_at(now),
            _ => true,
        }
    }

    pub fn description(&self) -> String {
        match &self.root {
            Some(root) => root.as_condition().description(),
            None => "No conditions".to_string(),
        }
    }

    pub fn progress_percentage(&self) -> f64 {
        match &self.root {
            Some(root) if !root.children().is_empty() => {
                root.as_condition().progress_percentage()
            }
            _ => 100.0,
        }
    }

    pub fn status_info(&self, indent: usize, show_progress: bool) -> String {
        let mut text = match &self.root {
            Some(root) => root.as_condition().status_info(indent, show_progress),
            None => format!("{}No conditions", " ".repeat(indent)),
        };
        if self.is_paused() {
            text.push_str(" (paused)");
        }
        text
    }

    /// Direct children that are not met right now
    pub fn blocking_conditions(&self) -> Vec<&ConditionNode> {
        self.blocking_conditions_at(Local::now())
    }

    /// Direct children that are not met at `now`
    pub fn blocking_conditions_at(&self, now: DateTime<Local>) -> Vec<&ConditionNode> {
        match &self.root {
            Some(Root::All(and)) => and.blocking_conditions_at(now),
            Some(Root::Any(or)) => or.blocking_conditions_at(now),
            None => Vec::new(),
        }
    }

    /// Whether any lock condition in the tree is held
    pub fn is_locked(&self) -> bool {
        self.conditions().iter().any(ConditionNode::is_locked)
    }

    /// Lock or release every lock condition in the tree. Returns false when
    /// the tree has none.
    pub fn set_locked(&mut self, locked: bool) -> bool {
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let mut found = false;
        for lock in root.children_mut().iter_mut().flat_map(|c| c.lock_conditions_mut()) {
            if locked {
                lock.lock();
            } else {
                lock.unlock();
            }
            found = true;
        }
        found
    }

    pub fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        self.root
            .as_ref()
            .and_then(|root| root.as_condition().next_trigger_time())
    }

    pub fn handle_event(&mut self, event: &GameEvent) {
        if self.is_paused() {
            log::debug!("Paused, dropping {} event", event.name());
            return;
        }
        if let Some(root) = self.root.as_mut() {
            root.as_condition_mut()
                .handle_event(event, self.world.as_ref());
        }
    }

    /// Start following the world: cached leaves compute their first value.
    pub fn activate(&mut self) {
        self.active = true;
        if let Some(root) = self.root.as_mut() {
            root.as_condition_mut().activate(self.world.as_ref());
        }
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        if let Some(root) = self.root.as_mut() {
            root.as_condition_mut().deactivate();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Re-capture baselines; `randomize` re-rolls randomized targets.
    pub fn reset(&mut self, randomize: bool) {
        let now = Local::now();
        self.reset_at(randomize, now);
    }

    pub fn reset_at(&mut self, randomize: bool, now: DateTime<Local>) {
        let Some(root) = self.root.as_mut() else {
            return;
        };
        let mut ctx = ConditionContext::new(self.world.as_ref(), &mut self.rng)
            .at(now)
            .randomizing(randomize);
        root.as_condition_mut().reset(&mut ctx);
        log::info!("Conditions reset (randomize: {})", randomize);
    }

    /// Stop evaluating. Returns false if already paused.
    pub fn pause(&mut self) -> bool {
        self.pause_at(Local::now())
    }

    pub fn pause_at(&mut self, now: DateTime<Local>) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(now);
        log::info!("Conditions paused");
        true
    }

    /// Resume evaluating. Time conditions are shifted by the pause length.
    pub fn resume(&mut self) -> bool {
        self.resume_at(Local::now())
    }

    pub fn resume_at(&mut self, now: DateTime<Local>) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        let paused_for = now - paused_at;
        if let Some(root) = self.root.as_mut() {
            root.as_condition_mut()
                .resume(paused_for, self.world.as_ref());
        }
        log::info!("Conditions resumed after {}s", paused_for.num_seconds());
        true
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Persisted form of the whole tree
    pub fn to_document(&self) -> Value {
        match &self.root {
            Some(root) => serialization::logical_to_value(root.kind(), root.children()),
            None => serialization::logical_to_value(ConditionKind::And, &[]),
        }
    }

    /// Replace the tree with one read from `document`
    pub fn load_document(&mut self, document: &Value) -> Result<(), SerializationError> {
        let policy = self.policy;
        let node = {
            let mut ctx = self.context();
            serialization::from_value(document, &mut ctx, policy)?
        };
        self.set_root(node);
        log::info!(
            "Loaded {} condition(s) from document",
            self.conditions().len()
        );
        Ok(())
    }
}

/// Bus subscriber that feeds one manager
struct ManagerSink {
    name: String,
    manager: Arc<Mutex<ConditionManager>>,
}

#[async_trait]
impl EventSink for ManagerSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, event: &GameEvent) {
        self.manager.lock().await.handle_event(event);
    }
}

/// Shared handle tying a [`ConditionManager`] to an [`EventBus`].
#[derive(Clone)]
pub struct ConditionService {
    name: String,
    manager: Arc<Mutex<ConditionManager>>,
    bus: EventBus,
    subscription: Arc<Mutex<Option<SubscriptionId>>>,
}

impl ConditionService {
    pub fn new(name: impl Into<String>, manager: ConditionManager, bus: EventBus) -> Self {
        Self {
            name: name.into(),
            manager: Arc::new(Mutex::new(manager)),
            bus,
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lock(&self) -> MutexGuard<'_, ConditionManager> {
        self.manager.lock().await
    }

    /// Activate the tree and subscribe it to the bus. Idempotent.
    pub async fn register_events(&self) -> SubscriptionId {
        let mut subscription = self.subscription.lock().await;
        if let Some(id) = *subscription {
            return id;
        }
        self.manager.lock().await.activate();
        let sink = ManagerSink {
            name: self.name.clone(),
            manager: Arc::clone(&self.manager),
        };
        let id = self.bus.subscribe(Arc::new(sink)).await;
        log::info!("Conditions '{}' registered for events", self.name);
        *subscription = Some(id);
        id
    }

    /// Detach from the bus. Returns false when not registered.
    pub async fn unregister_events(&self) -> bool {
        let Some(id) = self.subscription.lock().await.take() else {
            return false;
        };
        self.bus.unsubscribe(id).await;
        self.manager.lock().await.deactivate();
        log::info!("Conditions '{}' unregistered", self.name);
        true
    }

    pub async fn is_registered(&self) -> bool {
        self.subscription.lock().await.is_some()
    }

    pub async fn are_conditions_met(&self) -> bool {
        self.manager.lock().await.are_conditions_met()
    }

    pub async fn status_info(&self, show_progress: bool) -> String {
        self.manager.lock().await.status_info(0, show_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::location::RegionCondition;
    use crate::condition::resource::LootItemCondition;
    use crate::condition::testing::{stack, t0, world};
    use crate::condition::time::{FixedEndTimeCondition, IntervalCondition};
    use crate::condition::{LockCondition, NotCondition};
    use crate::runtime::world::{ContainerId, SnapshotWorld, WorldPoint};
    use chrono::Duration;

    fn manager() -> (Arc<SnapshotWorld>, ConditionManager) {
        let world = Arc::new(world());
        let config = EngineConfig {
            rng_seed: Some(3),
            ..Default::default()
        };
        let manager = ConditionManager::with_config(world.clone(), &config);
        (world, manager)
    }

    fn past() -> FixedEndTimeCondition {
        FixedEndTimeCondition::at(t0() - Duration::days(1))
    }

    fn future() -> FixedEndTimeCondition {
        FixedEndTimeCondition::at(Local::now() + Duration::days(365))
    }

    #[test]
    fn test_no_conditions_is_met() {
        let (_, mut manager) = manager();
        assert!(manager.are_conditions_met());
        manager.require_any();
        assert!(manager.are_conditions_met());
        assert_eq!(manager.description(), "No conditions");
    }

    #[test]
    fn test_root_created_lazily_as_and() {
        let (_, mut manager) = manager();
        manager.add_condition(past()).add_condition(future());
        assert_eq!(manager.root_kind(), ConditionKind::And);
        assert_eq!(manager.conditions().len(), 2);
        assert!(!manager.are_conditions_met());
        assert_eq!(manager.blocking_conditions().len(), 1);
    }

    #[test]
    fn test_blocking_conditions_at_pinned_clock() {
        let (_, mut manager) = manager();
        manager
            .add_condition(past())
            .add_condition(FixedEndTimeCondition::at(t0() + Duration::hours(1)));
        assert_eq!(manager.blocking_conditions_at(t0()).len(), 1);
        assert!(!manager.are_conditions_met_at(t0()));
        assert!(manager.blocking_conditions_at(t0() + Duration::hours(1)).is_empty());
    }

    #[test]
    fn test_lock_holds_tree_until_released() {
        let (_, mut manager) = manager();
        assert!(!manager.set_locked(true));
        manager
            .add_condition(past())
            .add_condition(NotCondition::new(FixedEndTimeCondition::at(t0() + Duration::hours(1))));
        manager.add_condition(LockCondition::new("banking"));
        assert!(manager.are_conditions_met_at(t0()));

        assert!(manager.set_locked(true));
        assert!(manager.is_locked());
        assert!(!manager.are_conditions_met_at(t0()));
        assert_eq!(manager.blocking_conditions_at(t0()).len(), 1);

        assert!(manager.set_locked(false));
        assert!(!manager.is_locked());
        assert!(manager.are_conditions_met_at(t0()));
    }

    #[test]
    fn test_require_any_keeps_children() {
        let (_, mut manager) = manager();
        manager.add_condition(past()).add_condition(future());
        manager.require_any();
        assert_eq!(manager.root_kind(), ConditionKind::Or);
        assert_eq!(manager.conditions().len(), 2);
        assert!(manager.are_conditions_met());

        manager.require_all();
        assert!(manager.requires_all());
        assert_eq!(manager.conditions().len(), 2);
        assert!(!manager.are_conditions_met());
    }

    #[test]
    fn test_set_root_wraps_leaves() {
        let (_, mut manager) = manager();
        manager.set_root(NotCondition::new(future()));
        assert_eq!(manager.root_kind(), ConditionKind::And);
        assert_eq!(manager.conditions().len(), 1);
        assert!(manager.are_conditions_met());
    }

    #[test]
    fn test_each_event_delivered_once() {
        let (world, mut manager) = manager();
        let loot = {
            let mut ctx = manager.context();
            LootItemCondition::new("Bones", 2, &mut ctx).unwrap()
        };
        manager.add_condition(loot);
        let event = GameEvent::container(ContainerId::Inventory, vec![stack("Bones", 1)]);
        world.apply(&event);
        manager.handle_event(&event);
        assert!(!manager.are_conditions_met());
        assert_eq!(manager.progress_percentage(), 50.0);
    }

    #[test]
    fn test_added_condition_activated_when_active() {
        let (world, mut manager) = manager();
        manager.activate();
        world.set_location(Some(WorldPoint::new(3230, 9500, 0)));
        manager.add_condition(RegionCondition::new("Cave", [12948]));
        assert!(manager.are_conditions_met());
    }

    #[test]
    fn test_pause_drops_events_and_shifts_time() {
        let (world, mut manager) = manager();
        let interval = {
            let mut ctx = manager.context().at(t0());
            IntervalCondition::new(Duration::minutes(10), &mut ctx).unwrap()
        };
        let loot = {
            let mut ctx = manager.context();
            LootItemCondition::new("Bones", 1, &mut ctx).unwrap()
        };
        manager.add_condition(interval).add_condition(loot);
        manager.require_any();

        assert!(manager.pause_at(t0() + Duration::minutes(5)));
        assert!(!manager.pause_at(t0() + Duration::minutes(6)));
        assert!(!manager.are_conditions_met_at(t0() + Duration::hours(1)));
        let event = GameEvent::container(ContainerId::Inventory, vec![stack("Bones", 1)]);
        world.apply(&event);
        manager.handle_event(&event);

        assert!(manager.resume_at(t0() + Duration::minutes(15)));
        assert!(!manager.are_conditions_met_at(t0() + Duration::minutes(19)));
        assert!(manager.are_conditions_met_at(t0() + Duration::minutes(20)));
    }

    #[test]
    fn test_reset_clears_progress() {
        let (world, mut manager) = manager();
        let loot = {
            let mut ctx = manager.context();
            LootItemCondition::new("Bones", 1, &mut ctx).unwrap()
        };
        manager.add_condition(loot);
        let event = GameEvent::container(ContainerId::Inventory, vec![stack("Bones", 1)]);
        world.apply(&event);
        manager.handle_event(&event);
        assert!(manager.are_conditions_met());
        manager.reset(false);
        assert!(!manager.are_conditions_met());
    }

    #[test]
    fn test_status_info_marks_pause() {
        let (_, mut manager) = manager();
        manager.add_condition(past());
        manager.pause();
        let status = manager.status_info(0, true);
        assert!(status.starts_with("ALL of: (Time reached:"));
        assert!(status.lines().next().unwrap().contains("1/1 conditions SATISFIED"));
        assert!(status.ends_with("(paused)"));
    }

    #[tokio::test]
    async fn test_service_register_and_unregister() {
        let (world, mut manager) = manager();
        let loot = {
            let mut ctx = manager.context();
            LootItemCondition::new("Bones", 2, &mut ctx).unwrap()
        };
        manager.add_condition(loot);
        let bus = EventBus::new();
        let service = ConditionService::new("test", manager, bus.clone());

        let id = service.register_events().await;
        assert_eq!(service.register_events().await, id);
        assert_eq!(bus.len().await, 1);
        assert!(service.lock().await.is_active());

        let event = GameEvent::container(ContainerId::Inventory, vec![stack("Bones", 2)]);
        world.apply(&event);
        bus.publish(&event).await;
        assert!(service.are_conditions_met().await);

        assert!(service.unregister_events().await);
        assert!(!service.unregister_events().await);
        assert!(bus.is_empty().await);
        assert!(!service.lock().await.is_active());
    }
}
