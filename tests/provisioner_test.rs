use balanced_mirror::application::mirror::Mirror;
use balanced_mirror::application::provisioner::AccountProvisioner;
use balanced_mirror::config::Config;
use balanced_mirror::domain::user::User;
use balanced_mirror::infrastructure::in_memory::{in_memory_stores, InMemoryGateway};
use std::collections::HashMap;
use std::sync::Arc;

fn config_with(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
}

fn setup(config: &Config) -> (Arc<InMemoryGateway>, Arc<Mirror>, AccountProvisioner) {
    let gateway = Arc::new(InMemoryGateway::new());
    let mirror = Arc::new(Mirror::new(gateway.clone(), in_memory_stores()));
    let provisioner = AccountProvisioner::new(mirror.clone(), config);
    (gateway, mirror, provisioner)
}

#[tokio::test]
async fn test_flag_enables_eager_provisioning() {
    let config = config_with(&[("AUTO_CREATE_BALANCED_ACCOUNT", "True")]);
    let (gateway, mirror, provisioner) = setup(&config);
    let user = User::new(12, "carla");

    assert!(provisioner.is_enabled());
    let account = provisioner.on_user_created(&user).await.unwrap().unwrap();

    assert_eq!(gateway.account_creations().await, 1);
    assert_eq!(mirror.account_for(user.id).await.unwrap(), Some(account));
}

#[tokio::test]
async fn test_without_flag_account_is_created_lazily() {
    let (gateway, mirror, provisioner) = setup(&config_with(&[]));
    let user = User::new(12, "carla");

    assert!(provisioner.on_user_created(&user).await.unwrap().is_none());
    assert!(mirror.account_for(user.id).await.unwrap().is_none());

    // First payment-related use creates it.
    let account = mirror.ensure_account(&user).await.unwrap();
    assert_eq!(account.user_id, user.id);
    assert_eq!(gateway.account_creations().await, 1);
}

#[tokio::test]
async fn test_forced_provisioning_reuses_existing_account() {
    let (gateway, mirror, provisioner) = setup(&config_with(&[("AUTO_CREATE_BALANCED_ACCOUNT", "0")]));
    let user = User::new(3, "dev");
    let existing = mirror.ensure_account(&user).await.unwrap();

    let forced = provisioner.ensure_account(&user).await.unwrap();

    assert_eq!(forced.uri, existing.uri);
    assert_eq!(gateway.account_creations().await, 1);
}
