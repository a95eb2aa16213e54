// security.rs: render policy rules, activation lifecycle, safe regions and audit logging

mod common;

use common::*;
#[allow(unused_imports)]
use common::{assert_eq, assert_ne};
use render_guard::security::{
    Actions, AuditEvent, AuditLogger, Credential, LoggerScope, Operation, PolicyViolation,
    RenderScope, RenderSecurityPolicy, Resource, SecurityHook, SecurityHost,
};
use rstest::rstest;
use serial_test::serial;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

// ============================================================================
// Always-denied Categories
// ============================================================================

#[rstest]
#[case(Operation::Exec { command: "/bin/ls".into() }, "Exec access not allowed during rendering (/bin/ls)")]
#[case(Operation::Exit { status: -1 }, "Exit access not allowed during rendering (-1)")]
#[case(Operation::PackageDefinition { package: "sun.misc".into() }, "Package access not allowed during rendering (sun.misc)")]
#[case(Operation::PrintJobAccess, "Print access not allowed during rendering")]
#[case(Operation::AccessEventQueue, "Event access not allowed during rendering")]
#[case(Operation::AccessClipboard, "Clipboard access not allowed during rendering")]
#[case(Operation::ShowWindowWithoutWarningBanner, "Window access not allowed during rendering")]
#[case(Operation::WriteDescriptor, "Write access not allowed during rendering (fd)")]
#[case(Operation::Connect { host: "example.com".into(), port: Some(80) }, "Socket access not allowed during rendering (example.com:80)")]
#[case(Operation::Listen { port: 8080 }, "Socket access not allowed during rendering (8080)")]
#[case(Operation::Accept { host: "10.0.0.1".into(), port: 5000 }, "Socket access not allowed during rendering (10.0.0.1:5000)")]
#[case(Operation::Multicast { address: "224.0.0.1".into() }, "Socket access not allowed during rendering (224.0.0.1)")]
#[case(Operation::SetSocketFactory, "Socket access not allowed during rendering")]
#[case(Operation::PropertiesAccess, "Property access not allowed during rendering")]
#[case(Operation::PropertyWrite { key: "java.io.tmpdir".into() }, "Write access not allowed during rendering (java.io.tmpdir)")]
#[case(Operation::file("/foo", "execute"), "Write access not allowed during rendering (/foo)")]
#[case(Operation::file("/foo", "delete"), "Write access not allowed during rendering (/foo)")]
#[case(Operation::Other { name: "setIO".into(), actions: Actions::parse("write") }, "Write access not allowed during rendering (setIO)")]
fn test_denied_during_rendering(#[case] operation: Operation, #[case] message: &str) {
    let session = Session::new(bare_policy());
    session.activate();
    assert_denied(session.policy.check(&operation), message);
    session.dispose();
}

#[rstest]
#[case(Operation::CreateClassLoader)]
#[case(Operation::ThreadAccess)]
#[case(Operation::ThreadGroupAccess)]
#[case(Operation::PropertyRead { key: "user.home".into() })]
#[case(Operation::PropertyWrite { key: "user.timezone".into() })]
#[case(Operation::PropertyWrite { key: "java.awt.headless".into() })]
#[case(Operation::Link { library: "jsound".into() })]
#[case(Operation::file("/foo", ""))]
#[case(Operation::Other { name: "accessDeclaredMembers".into(), actions: Actions::parse("") })]
fn test_allowed_during_rendering(#[case] operation: Operation) {
    let session = Session::new(bare_policy());
    session.activate();
    assert!(session.policy.check(&operation).is_ok(), "{} should be allowed", operation);
    session.dispose();
}

#[test]
fn test_link_outside_allow_list() {
    let session = Session::new(bare_policy());
    session.activate();
    assert_denied(
        session.policy.check_link("/usr/lib/libevil.so"),
        "Link access not allowed during rendering (/usr/lib/libevil.so)",
    );
    assert!(session.policy.check_link("jsound").is_ok());
    session.dispose();
}

#[test]
fn test_allow_listed_name_at_writable_path_denied() {
    let session = Session::new(bare_policy());
    let planted = std::env::temp_dir().join("attacker").join("libjsound.so");
    let planted = planted.to_str().unwrap();

    session.activate();
    assert_denied(
        session.policy.check_link(planted),
        &format!("Link access not allowed during rendering ({})", planted),
    );
    assert!(session.policy.check_link("/usr/lib/libjsound.so").is_err());
    session.dispose();
}

#[test]
fn test_link_under_runtime_home() {
    let runtime = TempDir::new().unwrap();
    let library = runtime.path().join("lib").join("libawt.so");
    let session = Session::new(bare_policy());
    let policy = Arc::new(
        Arc::try_unwrap(session.policy)
            .unwrap()
            .with_runtime_home(Some(runtime.path().to_path_buf())),
    );

    policy.activate(&session.credential).unwrap();
    assert!(policy.check_link(library.to_str().unwrap()).is_ok());
    policy.dispose(&session.credential).unwrap();
}

#[test]
fn test_configured_native_library_and_property() {
    let session = Session::new(
        bare_policy()
            .with_allowed_native_libraries(["fontmanager"])
            .with_writable_properties(["render.theme"]),
    );
    session.activate();
    assert!(session.policy.check_link("libfontmanager.dylib").is_ok());
    assert!(session.policy.check_property_write("render.theme").is_ok());
    assert!(session.policy.check_property_write("user.dir").is_err());
    session.dispose();
}

// ============================================================================
// Property Enumeration
// ============================================================================

#[test]
fn test_properties_access_from_logger_scope() {
    let session = Session::new(bare_policy());
    session.activate();

    assert!(session.policy.check_properties_access().is_err());
    {
        let _logging = LoggerScope::enter();
        assert!(session.policy.check_properties_access().is_ok());
    }
    assert!(session.policy.check_properties_access().is_err());
    session.dispose();
}

#[test]
fn test_properties_access_override() {
    let session = Session::new(bare_policy().with_properties_access(|| true));
    session.activate();
    assert!(session.policy.check_properties_access().is_ok());
    session.dispose();
}

// ============================================================================
// Read Rule
// ============================================================================

#[cfg(unix)]
#[test]
fn test_read_outside_roots_denied() {
    let session = Session::new(project_policy(true, vec![]));
    for path in [
        "/foo",
        "/Users/userHome/Sdk/../foo",
        "/Users/userHome",
        "/Users/userHome/Projects/project1/../../test",
    ] {
        session.activate();
        assert_denied(
            session.policy.check_read(path),
            &format!("Read access not allowed during rendering ({})", path),
        );
        assert_eq!(session.host.last_failed_path().as_deref(), Some(path));
        session.dispose();
    }
}

#[cfg(unix)]
#[test]
fn test_read_inside_roots_allowed() {
    let session = Session::new(project_policy(true, vec![]));
    for path in [
        "/Users/userHome/Sdk/foo",
        "/Users/userHome/Sdk/foo.jar",
        "/Users/userHome/Sdk/foo/test",
        "/Users/userHome/Sdk/foo/../foo.jar",
        "/Users/userHome/Sdk/foo/../../Sdk/test/foo.jar",
        "/Users/userHome/Projects/project1/path/test.kt",
        "/Users/userHome/Projects/project1/test.kt",
        "/Users/userHome/Projects/project1/../project1/test.kt",
    ] {
        session.activate();
        assert!(session.policy.check_read(path).is_ok(), "{} should be readable", path);
        session.dispose();
    }
}

#[test]
fn test_reads_unchecked_unless_restricted() {
    let session = Session::new(project_policy(false, vec![]));
    session.activate();
    assert!(session.policy.check_read("/etc/passwd").is_ok());
    session.dispose();
}

#[test]
fn test_named_read_permission_follows_read_rule() {
    let read = |name: &str| Operation::Other {
        name: name.to_string(),
        actions: Actions::parse("read"),
    };

    let unrestricted = Session::new(project_policy(false, vec![]));
    unrestricted.activate();
    assert!(unrestricted.policy.check(&read("/etc/shadow")).is_ok());
    unrestricted.dispose();

    let restricted = Session::new(project_policy(true, vec![]));
    restricted.activate();
    assert_denied(
        restricted.policy.check(&read("/etc/shadow")),
        "Read access not allowed during rendering (/etc/shadow)",
    );
    assert!(restricted
        .policy
        .check(&read("/Users/userHome/Sdk/platforms/android.jar"))
        .is_ok());
    restricted.dispose();
}

#[test]
fn test_named_write_permission_uses_property_allow_list() {
    let session = Session::new(bare_policy());
    let write = |name: &str| Operation::Other {
        name: name.to_string(),
        actions: Actions::parse("write"),
    };

    session.activate();
    assert!(session.policy.check(&write("user.timezone")).is_ok());
    assert!(session.policy.check(&write("setIO")).is_err());
    session.dispose();
}

#[test]
fn test_read_temp_dir_when_restricted() {
    let session = Session::new(project_policy(true, vec![]));
    let file = std::env::temp_dir().join("render-guard-read.txt");
    session.activate();
    assert!(session.policy.check_read(file.to_str().unwrap()).is_ok());
    session.dispose();
}

// ============================================================================
// Write Rule
// ============================================================================

#[cfg(unix)]
#[test]
fn test_write_outside_allowed_paths_denied() {
    let cache = "/opt/render-guard-test/caches";
    let session = Session::new(project_policy(false, vec![PathBuf::from(cache)]));
    let cache_dir = format!("{}/", cache);

    for path in [
        "foo".to_string(),
        cache_dir.clone(),
        cache.to_string(),
        format!("{}../foo", cache_dir),
        format!("{}../../test.jar", cache_dir),
    ] {
        session.activate();
        assert_denied(
            session.policy.check(&Operation::file(path.as_str(), "write")),
            &format!("Write access not allowed during rendering ({})", path),
        );
        session.dispose();
    }
}

#[cfg(unix)]
#[test]
fn test_write_beneath_allowed_paths() {
    let cache = "/opt/render-guard-test/caches";
    let session = Session::new(project_policy(false, vec![PathBuf::from(cache)]));

    for path in [
        format!("{}//test/../test.jar", cache),
        format!("{}/foo.jar", cache),
    ] {
        session.activate();
        assert!(
            session.policy.check(&Operation::file(path.as_str(), "write")).is_ok(),
            "{} should be writable",
            path
        );
        session.dispose();
    }
}

#[test]
fn test_temp_dir_forms_writable() {
    let session = Session::new(bare_policy());
    let temp = std::env::temp_dir();
    let raw = temp.to_str().unwrap().to_string();
    let with_separator = format!(
        "{}{}",
        raw.trim_end_matches(std::path::MAIN_SEPARATOR),
        std::path::MAIN_SEPARATOR
    );
    let canonical = std::fs::canonicalize(&temp).unwrap();

    session.activate();
    for path in [raw.as_str(), with_separator.as_str(), canonical.to_str().unwrap()] {
        assert!(
            session.policy.check(&Operation::file(path, "read,write")).is_ok(),
            "{} should be writable",
            path
        );
    }
    session.dispose();
}

#[cfg(unix)]
#[test]
fn test_app_temp_dir_writable() {
    let session = Session::new(bare_policy().with_app_temp_dir("/random/path/"));
    session.activate();
    assert!(session
        .policy
        .check(&Operation::file("/random/path/myfile.tmp", "read,write"))
        .is_ok());
    session.dispose();
}

#[cfg(unix)]
#[test]
fn test_traversal_out_of_temp_denied() {
    let session = Session::new(bare_policy());
    session.activate();
    assert_denied(
        session.policy.check(&Operation::file("/tmp/../dev/null", "read,write")),
        "Write access not allowed during rendering (/tmp/../dev/null)",
    );
    session.dispose();
}

#[test]
fn test_delete_uses_delete_label() {
    let session = Session::new(bare_policy());
    session.activate();
    let target = std::env::temp_dir().join("render-guard-delete.txt");
    assert!(session.policy.check_delete(target.to_str().unwrap()).is_ok());
    assert_denied(
        session.policy.check_delete("/etc/hosts"),
        "Delete access not allowed during rendering (/etc/hosts)",
    );
    session.dispose();
}

// ============================================================================
// Symbolic Links
// ============================================================================

#[cfg(unix)]
#[test]
fn test_directory_link_out_of_temp_denied() {
    let inside = TempDir::new().unwrap();
    let outside = TempDir::new_in(env!("CARGO_TARGET_TMPDIR")).unwrap();
    let link = inside.path().join("elsewhere");
    std::os::unix::fs::symlink(outside.path(), &link).unwrap();
    let victim = link.join("victim.txt");
    let victim = victim.to_str().unwrap();

    let session = Session::new(bare_policy());
    session.activate();
    assert_denied(
        session.policy.check(&Operation::file(victim, "write")),
        &format!("Write access not allowed during rendering ({})", victim),
    );
    session.dispose();

    let session = Session::new(project_policy(true, vec![]));
    session.activate();
    assert_denied(
        session.policy.check(&Operation::file(victim, "read")),
        &format!("Read access not allowed during rendering ({})", victim),
    );
    assert_eq!(session.host.last_failed_path().as_deref(), Some(victim));
    session.dispose();
}

#[cfg(unix)]
#[test]
fn test_write_through_dangling_symlink_denied() {
    let dir = TempDir::new().unwrap();
    let victim = dir.path().join("victim");
    let attack = dir.path().join("attack");
    std::os::unix::fs::symlink(&victim, &attack).unwrap();
    let attack = attack.to_str().unwrap();

    let session = Session::new(bare_policy());
    session.activate();
    assert_denied(
        session.policy.check(&Operation::file(attack, "read,write")),
        &format!("Write access not allowed during rendering ({})", attack),
    );
    assert_eq!(session.host.last_failed_path().as_deref(), Some(attack));
    session.dispose();
}

#[cfg(unix)]
#[test]
fn test_write_through_existing_symlink_denied() {
    let dir = TempDir::new().unwrap();
    let victim = dir.path().join("victim");
    std::fs::write(&victim, "data").unwrap();
    let attack = dir.path().join("attack");
    std::os::unix::fs::symlink(&victim, &attack).unwrap();

    let session = Session::new(bare_policy());
    session.activate();
    assert!(session
        .policy
        .check(&Operation::file(attack.to_str().unwrap(), "read,write"))
        .is_err());
    // The target itself lives in the temp directory
    assert!(session
        .policy
        .check(&Operation::file(victim.to_str().unwrap(), "read,write"))
        .is_ok());
    session.dispose();
}

#[test]
fn test_symlink_creation_denied() {
    let session = Session::new(bare_policy());
    let link = std::env::temp_dir().join("attack");
    let link = link.to_str().unwrap();

    session.activate();
    assert_denied(
        session.policy.check(&Operation::CreateSymbolicLink {
            link: link.to_string(),
        }),
        &format!("SymbolicLinks access not allowed during rendering ({})", link),
    );
    session.dispose();
}

// ============================================================================
// Thread Scoping
// ============================================================================

#[test]
fn test_only_render_scope_is_policed() {
    let session = Session::with_host(bare_policy(), Arc::new(SecurityHost::new()));
    session.activate();

    assert!(session.policy.check_exec("/bin/ls").is_ok());
    RenderScope::run(|| {
        assert_denied(
            session.policy.check_exec("/bin/ls"),
            "Exec access not allowed during rendering (/bin/ls)",
        );
        let policy = session.policy.clone();
        let spawned = thread::spawn(move || policy.check_exec("/bin/ls").is_ok())
            .join()
            .unwrap();
        assert!(spawned);
    });
    assert!(session.policy.check_exec("/bin/ls").is_ok());

    session.dispose();
}

#[test]
fn test_current_policy_only_when_relevant() {
    let session = Session::with_host(bare_policy(), Arc::new(SecurityHost::new()));
    session.activate();

    assert!(session.host.current_policy().is_none());
    RenderScope::run(|| {
        let current = session.host.current_policy().expect("policy should be current");
        assert!(Arc::ptr_eq(&current, &session.policy));
    });

    session.dispose();
    RenderScope::run(|| assert!(session.host.current_policy().is_none()));
}

// ============================================================================
// Kill Switch
// ============================================================================

#[test]
fn test_disabled_host_allows_everything() {
    let session = Session::with_host(
        bare_policy().with_render_thread(|| true),
        Arc::new(SecurityHost::with_enabled(false)),
    );
    session.activate();
    assert!(session.policy.check_exec("/bin/ls").is_ok());
    assert!(session.policy.check_exit(1).is_ok());
    assert!(session.policy.check_write("/etc/passwd").is_ok());
    session.dispose();
}

#[rstest]
#[case("false", false)]
#[case("true", true)]
#[case("FALSE", true)]
#[serial]
fn test_kill_switch_from_environment(#[case] value: &str, #[case] enabled: bool) {
    std::env::remove_var("android.render.sandbox");
    std::env::set_var("ANDROID_RENDER_SANDBOX", value);
    let host = SecurityHost::from_env();
    std::env::remove_var("ANDROID_RENDER_SANDBOX");

    assert_eq!(host.is_enabled(), enabled);
}

// ============================================================================
// Activation Lifecycle
// ============================================================================

#[test]
fn test_activation_is_idempotent() {
    let session = Session::new(bare_policy());
    session.activate();
    session.activate();
    assert!(session.policy.is_active());

    session.dispose();
    assert!(!session.policy.is_active());
    assert!(session.host.installed().is_none());
    // Disposing twice is a no-op
    session.dispose();
}

#[test]
fn test_toggle_active() {
    let session = Session::new(bare_policy());
    let check = || session.policy.check(&Operation::file("/foo", "execute"));

    session.policy.set_active(true, &session.credential).unwrap();
    assert!(check().is_err());
    session.policy.set_active(false, &session.credential).unwrap();
    assert!(check().is_ok());
    session.policy.set_active(true, &session.credential).unwrap();
    assert!(check().is_err());
    session.policy.set_active(false, &session.credential).unwrap();
}

#[test]
fn test_invalid_credential() {
    let session = Session::new(bare_policy());
    session.activate();

    assert_denied(
        session.policy.deactivate(&Credential::new()),
        "Security access not allowed during rendering (Invalid credential)",
    );
    assert!(session.policy.is_active());
    assert!(session.policy.check_exec("/bin/ls").is_err());
    assert!(session
        .audit
        .entries()
        .iter()
        .any(|entry| entry.event == AuditEvent::CredentialRejected));

    session.dispose();
}

#[test]
fn test_second_policy_refused() {
    let first = Session::new(bare_policy());
    first.activate();
    let second = Arc::new(
        bare_policy()
            .on_host(first.host.clone())
            .with_render_thread(|| false),
    );

    let err = second.activate(&Credential::new()).unwrap_err();
    assert_eq!(err.resource(), Resource::Security);
    assert_eq!(
        err.context(),
        Some("Another render security policy is already active")
    );
    assert!(first.policy.is_active());

    first.dispose();
}

#[test]
fn test_replacing_policy_from_render_thread_denied() {
    let session = Session::new(bare_policy());
    session.activate();

    assert_denied(
        session.host.install(None),
        "Security access not allowed during rendering",
    );
    assert!(session.policy.is_active());

    session.dispose();
}

struct RecordingHook;

impl SecurityHook for RecordingHook {
    fn check(&self, _operation: &Operation) -> Result<(), PolicyViolation> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[test]
fn test_previous_hook_restored() {
    let session = Session::new(bare_policy());
    session.host.install(Some(Arc::new(RecordingHook))).unwrap();

    session.activate();
    assert!(session.policy.is_active());
    session.dispose();

    let restored = session.host.installed().expect("previous hook restored");
    assert!(restored.as_any().is::<RecordingHook>());
}

#[test]
fn test_replacement_by_another_thread_logs_once() {
    let render_thread = thread::current().id();
    let session = Session::new(bare_policy());
    let policy = Arc::new(
        Arc::try_unwrap(session.policy)
            .unwrap()
            .with_render_thread(move || thread::current().id() == render_thread),
    );
    policy.activate(&session.credential).unwrap();

    let host = session.host.clone();
    thread::spawn(move || host.install(None))
        .join()
        .unwrap()
        .unwrap();

    assert!(!policy.is_active());
    policy.dispose(&session.credential).unwrap();
    assert_eq!(
        session.audit.warnings(),
        vec!["render security policy being replaced by another thread".to_string()]
    );
}

// ============================================================================
// Safe Regions
// ============================================================================

#[test]
fn test_safe_region_suspends_enforcement() {
    let session = Session::new(bare_policy());
    session.activate();
    let check = || session.policy.check(&Operation::file("/foo", "execute"));

    assert!(check().is_err());
    assert!(session.host.run_in_safe_region(&session.credential, || check().is_ok()));
    assert!(check().is_err());

    session.dispose();
}

#[test]
fn test_safe_region_wrong_credential() {
    let session = Session::new(bare_policy());
    session.activate();

    let wrong = Credential::new();
    let result = session.host.run_in_safe_region(&wrong, || session.policy.check_exec("ls"));
    assert!(result.is_err());

    session.dispose();
}

#[test]
fn test_nested_safe_regions() {
    let session = Session::new(bare_policy());
    session.activate();

    let outer = session.host.enter_safe_region(&session.credential);
    let inner = session.host.enter_safe_region(&session.credential);
    assert!(outer.was_enabled());
    assert!(!inner.was_enabled());

    session.host.exit_safe_region(inner);
    assert!(session.policy.check_exec("ls").is_ok());
    session.host.exit_safe_region(outer);
    assert!(session.policy.check_exec("ls").is_err());

    session.dispose();
}

// ============================================================================
// Audit Logging
// ============================================================================

#[test]
fn test_audit_records_lifecycle_and_denials() {
    let session = Session::new(bare_policy());
    session.activate();
    let _ = session.policy.check_exec("/bin/ls");
    session.dispose();

    let events: Vec<AuditEvent> = session.audit.entries().into_iter().map(|e| e.event).collect();
    assert_eq!(
        events,
        vec![
            AuditEvent::Activated,
            AuditEvent::Denied {
                operation: "exec /bin/ls".to_string(),
                violation: "Exec access not allowed during rendering (/bin/ls)".to_string(),
            },
            AuditEvent::Deactivated,
        ]
    );
    assert!(session.audit.warnings().is_empty());
}

#[test]
fn test_global_current_is_empty_without_activation() {
    assert!(RenderSecurityPolicy::current().is_none());
}
