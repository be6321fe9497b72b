// Parsers and the OS provider through the public API

use std::io::Write;

use hostmon::core::system_monitor::SystemProvider;
use hostmon::platform::{parse_df_output, parse_dhcp_leases, parse_service_statuses, read_dhcp_leases, OsProvider};
use tempfile::NamedTempFile;

#[test]
fn test_df_macos_style_output() {
    let output = "\
Filesystem   1024-blocks      Used Available Capacity  Mounted on
/dev/disk3s1   971350180 472131540 480573200    50%    /
devfs                205       205         0   100%    /dev
";
    let disks = parse_df_output(output);

    assert_eq!(disks.len(), 2);
    assert_eq!(disks["/dev"].free, 0);
    assert_eq!(disks["/"].percent, 50.0);
}

#[test]
fn test_lease_file_later_entry_wins() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "lease 10.0.0.5 {{\n  binding state free;\n}}\nlease 10.0.0.5 {{\n  binding state active;\n  client-hostname \"printer\";\n}}"
    )
    .unwrap();

    let leases = read_dhcp_leases(file.path()).unwrap();

    assert_eq!(leases.len(), 1);
    assert_eq!(leases[0].state.as_deref(), Some("active"));
    assert_eq!(leases[0].hostname.as_deref(), Some("printer"));
}

#[test]
fn test_empty_lease_file() {
    assert!(parse_dhcp_leases("").is_empty());
}

#[test]
fn test_service_statuses_ignore_noise() {
    let statuses = parse_service_statuses(" [ + ]  ssh\nusage: service\n");
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses["ssh"], Some(true));
}

#[test]
fn test_os_provider_reads_host_facts() {
    let provider = OsProvider::new();

    let facts = provider.host_facts().unwrap();

    assert!(!facts.hostname.is_empty());
    assert!(facts.cpus >= 1);
    assert!(facts.total_memory > 0);
    assert!(facts.free_memory <= facts.total_memory);
}
