// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end decisions through the service, with the expansion cache on.

use std::sync::Arc;

use warden_access_core::{
	ActionDescriptor, ActionNeed, Decision, DefaultPolicy, GrantUpdate, Identity, Need, Registry, ANY_USER,
	SUPERUSER_ACCESS,
};
use warden_server_access::{
	AccessOptions, AccessService, CacheBackend, MemoryCacheBackend, OwnerRef, Permission,
};
use warden_server_db::testing::create_access_test_pool;
use warden_server_db::GrantStore;

struct Harness {
	service: AccessService,
	backend: Arc<MemoryCacheBackend>,
}

impl Harness {
	async fn new(policy: DefaultPolicy) -> Self {
		let pool = create_access_test_pool().await.unwrap();

		let mut registry = Registry::with_builtins();
		registry.register_action(ActionDescriptor::parameterized("open")).unwrap();
		registry.register_action("close").unwrap();
		registry.register_action("old").unwrap();
		registry.register_action("new").unwrap();

		let backend = Arc::new(MemoryCacheBackend::new());
		let options = AccessOptions {
			default_policy: policy,
			cache: Some(backend.clone()),
			..AccessOptions::default()
		};
		let service = AccessService::new(pool, Arc::new(registry), options);
		Self { service, backend }
	}

	async fn cached(&self, key: &str) -> Option<String> {
		self.backend.get(&format!("Permission::action::{key}")).await.unwrap()
	}

	async fn user(&self, email: &str) -> Identity {
		self.service.admin().create_user(email).await.unwrap();
		self.service.loader().load_by_email(email).await.unwrap()
	}

	async fn member(&self, email: &str, role: &str) -> Identity {
		let admin = self.service.admin();
		if admin.list_roles(None).await.unwrap().iter().all(|r| r.name != role) {
			admin.create_role(role, None).await.unwrap();
		}
		admin.create_user(email).await.unwrap();
		admin.add_role(email, role).await.unwrap();
		self.service.loader().load_by_email(email).await.unwrap()
	}

	async fn allows(&self, action: &str, argument: Option<&str>, identity: &Identity) -> bool {
		self
			.service
			.permission(action, argument)
			.allows(self.service.engine(), identity)
			.await
			.unwrap()
	}
}

fn user(email: &str) -> OwnerRef {
	OwnerRef::User(email.to_string())
}

fn role(name: &str) -> OwnerRef {
	OwnerRef::Role(name.to_string())
}

#[tokio::test]
async fn deny_overrides_allow_through_role() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let alice = h.member("alice@example.com", "banned").await;
	let admin = h.service.admin();

	admin.allow("close", None, &[user("alice@example.com")]).await.unwrap();
	assert!(h.allows("close", None, &alice).await);

	admin.deny("close", None, &[role("banned")]).await.unwrap();
	assert!(!h.allows("close", None, &alice).await);

	let decision = h.service.check(&alice, &h.service.permission("close", None)).await.unwrap();
	assert_eq!(decision, Decision::Excluded(Need::role("banned")));
}

#[tokio::test]
async fn wildcard_and_specific_argument() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let one = h.user("one@example.com").await;
	let two = h.user("two@example.com").await;
	let admin = h.service.admin();
	admin.allow("open", None, &[user("one@example.com")]).await.unwrap();
	admin.allow("open", Some("x"), &[user("two@example.com")]).await.unwrap();

	let engine = h.service.engine();
	let one_need = Need::User(one.user_id().unwrap());
	let two_need = Need::User(two.user_id().unwrap());

	let unscoped = engine.expand_action(&ActionNeed::new("open")).await.unwrap();
	assert_eq!(unscoped.needs.into_iter().collect::<Vec<_>>(), vec![one_need.clone()]);

	let x = engine.expand_action(&ActionNeed::new("open").with_argument("x")).await.unwrap();
	assert_eq!(x.needs.into_iter().collect::<Vec<_>>(), vec![one_need.clone(), two_need]);

	let y = engine.expand_action(&ActionNeed::new("open").with_argument("y")).await.unwrap();
	assert_eq!(y.needs.into_iter().collect::<Vec<_>>(), vec![one_need]);

	assert!(h.allows("open", Some("x"), &two).await);
	assert!(!h.allows("open", Some("y"), &two).await);
	assert!(h.allows("open", Some("y"), &one).await);
}

#[tokio::test]
async fn default_policies_without_grants() {
	let deny = Harness::new(DefaultPolicy::DenyByDefault).await;
	let anyone = deny.user("anyone@example.com").await;
	assert!(!deny.allows("close", None, &anyone).await);
	assert!(!deny.allows("close", None, &deny.service.loader().anonymous()).await);

	let allow = Harness::new(DefaultPolicy::AllowByDefault).await;
	let anyone = allow.user("anyone@example.com").await;
	assert!(allow.allows("close", None, &anyone).await);
	assert!(allow.allows("close", None, &Identity::new()).await);

	// A per-permission policy overrides the service default.
	let permission = Permission::action("close").allow_by_default();
	assert!(permission.allows(deny.service.engine(), &Identity::new()).await.unwrap());
}

#[tokio::test]
async fn superuser_bypass_and_superuser_deny() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let root = h.user("root@example.com").await;
	let other = h.user("other@example.com").await;
	let admin = h.service.admin();

	admin.allow(SUPERUSER_ACCESS, None, &[user("root@example.com")]).await.unwrap();
	admin.allow("close", None, &[user("other@example.com")]).await.unwrap();

	assert!(h.allows("close", None, &root).await);
	assert!(h.allows("open", Some("17"), &root).await);
	assert!(!h.allows("open", Some("17"), &other).await);

	admin.deny(SUPERUSER_ACCESS, None, &[user("root@example.com")]).await.unwrap();
	assert!(!h.allows("close", None, &root).await);
	assert!(!h.allows("open", Some("17"), &root).await);
	assert!(h.allows("close", None, &other).await);
}

#[tokio::test]
async fn cache_follows_grant_creation() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let u = h.user("u@example.com").await;
	let u2 = h.user("u2@example.com").await;
	let admin = h.service.admin();
	let engine = h.service.engine();

	admin.allow("close", None, &[user("u@example.com")]).await.unwrap();
	assert_eq!(h.cached("close").await, None);

	let first = engine.expand_action(&ActionNeed::new("close")).await.unwrap();
	assert_eq!(first.needs.iter().cloned().collect::<Vec<_>>(), vec![Need::User(u.user_id().unwrap())]);
	assert!(first.excludes.is_empty());
	assert!(h.cached("close").await.is_some());

	admin.allow("close", None, &[user("u2@example.com")]).await.unwrap();
	assert_eq!(h.cached("close").await, None);

	let second = engine.expand_action(&ActionNeed::new("close")).await.unwrap();
	assert!(second.needs.contains(&Need::User(u.user_id().unwrap())));
	assert!(second.needs.contains(&Need::User(u2.user_id().unwrap())));
}

#[tokio::test]
async fn wildcard_change_invalidates_scoped_entries() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let u = h.user("u@example.com").await;
	let engine = h.service.engine();

	assert!(!h.allows("open", Some("5"), &u).await);
	assert!(h.cached("open::5").await.is_some());

	h.service.admin().allow("open", None, &[user("u@example.com")]).await.unwrap();
	assert_eq!(h.cached("open::5").await, None);
	assert!(h.allows("open", Some("5"), &u).await);

	let scoped = engine.expand_action(&ActionNeed::new("open").with_argument(5)).await.unwrap();
	assert!(scoped.needs.contains(&Need::User(u.user_id().unwrap())));
}

#[tokio::test]
async fn rename_invalidates_old_and_new() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let u = h.user("u@example.com").await;
	let engine = h.service.engine();

	let grants = h.service.admin().allow("old", None, &[user("u@example.com")]).await.unwrap();
	engine.expand_action(&ActionNeed::new("old")).await.unwrap();
	engine.expand_action(&ActionNeed::new("new")).await.unwrap();
	assert!(h.cached("old").await.is_some());
	assert!(h.cached("new").await.is_some());

	// The admin surface has no rename; update through the service's store.
	let renamed = h
		.service
		.grants()
		.update_grant(grants[0].id, &GrantUpdate::default().action("new"))
		.await
		.unwrap();
	assert_eq!(renamed.action, "new");
	assert_eq!(h.cached("old").await, None);
	assert_eq!(h.cached("new").await, None);

	assert!(!h.allows("old", None, &u).await);
	assert!(h.allows("new", None, &u).await);
}

#[tokio::test]
async fn remove_is_idempotent() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	h.user("u@example.com").await;
	let admin = h.service.admin();

	let removed = admin.remove("close", None, &[user("u@example.com")]).await.unwrap();
	assert!(removed.is_empty());

	admin.allow("close", None, &[user("u@example.com")]).await.unwrap();
	assert_eq!(admin.remove("close", None, &[user("u@example.com")]).await.unwrap().len(), 1);
	assert!(admin.remove("close", None, &[user("u@example.com")]).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_scenario() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	let opener = h.member("opener@example.com", "opener").await;
	let reader = h.member("reader@example.com", "reader").await;
	h.service.admin().create_role("admin", None).await.unwrap();

	h.service
		.admin()
		.allow("open", None, &[role("admin"), role("opener")])
		.await
		.unwrap();

	let open = Permission::new([Need::Action(ActionNeed::new("open"))]);
	assert!(open.allows(h.service.engine(), &opener).await.unwrap());
	assert!(!open.allows(h.service.engine(), &reader).await.unwrap());

	let needs = open.needs(h.service.engine()).await.unwrap();
	assert!(needs.contains(&Need::role("admin")));
	assert!(needs.contains(&Need::role("opener")));
	assert!(open.excludes(h.service.engine()).await.unwrap().is_empty());
}

#[tokio::test]
async fn any_user_grant_covers_anonymous_callers() {
	let h = Harness::new(DefaultPolicy::DenyByDefault).await;
	h.service
		.admin()
		.allow("close", None, &[OwnerRef::SystemRole(ANY_USER.to_string())])
		.await
		.unwrap();

	let anonymous = h.service.loader().anonymous();
	assert!(h.allows("close", None, &anonymous).await);
	assert!(!h.allows("close", None, &Identity::new()).await);
}
