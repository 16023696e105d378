//! Integration tests for the complete clone-and-integrate pipeline
//!
//! These tests verify end-to-end behavior across crates:
//! - donor definition → textual rewrite → identifier regeneration → clone file
//! - structural index and dump-metadata index → record insertion and grouping
//! - idempotent re-runs over a repository in a temp dir
//!
//! Run with: cargo test --test integration_tests

use confclone_engine::{CloneJob, EntityRef, NamespaceMap, RepoLayout};
use confclone_xmltree::Document;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// ============================================================================
// Fixture repository
// ============================================================================

fn write_repo(root: &Path) {
    fs::write(
        root.join("Configuration.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <cfg:MetaDataObject xmlns:cfg=\"http://v8.example/MDClasses\">\n\
         \t<cfg:Configuration uuid=\"f1d7b3a2-0000-4000-8000-0000000000aa\">\n\
         \t\t<cfg:Properties>\n\
         \t\t\t<cfg:Name>Demo</cfg:Name>\n\
         \t\t</cfg:Properties>\n\
         \t\t<cfg:ChildObjects>\n\
         \t\t\t<cfg:Language>Language.Main</cfg:Language>\n\
         \t\t\t<cfg:Catalog>Catalog.Items</cfg:Catalog>\n\
         \t\t\t<cfg:Document>Document.Orders</cfg:Document>\n\
         \t\t</cfg:ChildObjects>\n\
         \t</cfg:Configuration>\n\
         </cfg:MetaDataObject>\n",
    )
    .unwrap();
    fs::write(
        root.join("ConfigDumpInfo.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <xr:ConfigDumpInfo xmlns:xr=\"http://v8.example/dumpinfo\">\n\
         \t<xr:ConfigVersions>\n\
         \t\t<xr:ChildObjects>\n\
         \t\t\t<xr:Metadata>Catalog.Items</xr:Metadata>\n\
         \t\t\t<xr:Metadata>Document.Orders</xr:Metadata>\n\
         \t\t</xr:ChildObjects>\n\
         \t</xr:ConfigVersions>\n\
         </xr:ConfigDumpInfo>\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("Catalogs")).unwrap();
    fs::write(
        root.join("Catalogs/Items.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <cfg:MetaDataObject xmlns:cfg=\"http://v8.example/MDClasses\" \
         xmlns:xr=\"http://v8.example/dumpinfo\">\n\
         \t<cfg:Catalog uuid=\"11111111-1111-1111-1111-111111111111\">\n\
         \t\t<cfg:InternalInfo>\n\
         \t\t\t<xr:GeneratedType name=\"CatalogObject.Items\" category=\"Object\">\n\
         \t\t\t\t<xr:TypeId>22222222-2222-2222-2222-222222222222</xr:TypeId>\n\
         \t\t\t\t<xr:ValueId>33333333-3333-3333-3333-333333333333</xr:ValueId>\n\
         \t\t\t</xr:GeneratedType>\n\
         \t\t</cfg:InternalInfo>\n\
         \t\t<cfg:Properties>\n\
         \t\t\t<cfg:Name>Items</cfg:Name>\n\
         \t\t\t<cfg:Synonym/>\n\
         \t\t</cfg:Properties>\n\
         \t</cfg:Catalog>\n\
         </cfg:MetaDataObject>\n",
    )
    .unwrap();
}

fn widgets_job(root: &Path) -> CloneJob {
    CloneJob {
        repo: RepoLayout {
            root: root.to_path_buf(),
            type_group: "Catalogs".to_string(),
        },
        namespaces: NamespaceMap::default(),
        donor: EntityRef::new("Catalog", "Items"),
        clone_name: "Widgets".to_string(),
    }
}

fn records(path: &Path, collection: &str) -> Vec<String> {
    let doc = Document::parse(&fs::read_to_string(path).unwrap()).unwrap();
    let coll = doc.root.find(&|el| el.name == collection).unwrap();
    coll.child_elements().map(|el| el.text()).collect()
}

/// Records of one type must stay contiguous after integration.
fn assert_groups_contiguous(records: &[String]) {
    let mut seen: Vec<&str> = Vec::new();
    let mut prev = "";
    for record in records {
        let group = record.split('.').next().unwrap();
        if group != prev {
            assert!(
                !seen.contains(&group),
                "group {group} split across the index: {records:?}"
            );
            seen.push(group);
            prev = group;
        }
    }
}

// ============================================================================
// End-to-end protocol
// ============================================================================

#[test]
fn test_clone_protocol_end_to_end() {
    let dir = tempdir().unwrap();
    write_repo(dir.path());

    let outcome = widgets_job(dir.path()).run().expect("run succeeds");
    assert_eq!(outcome.indexes_updated, 2);

    // Clone definition exists, rewritten and re-identified.
    let clone_text = fs::read_to_string(dir.path().join("Catalogs/Widgets.xml")).unwrap();
    assert!(clone_text.contains("<cfg:Name>Widgets</cfg:Name>"));
    assert!(clone_text.contains("name=\"CatalogObject.Widgets\""));
    assert!(!clone_text.contains("11111111-1111-1111-1111-111111111111"));
    assert!(!clone_text.contains("22222222-2222-2222-2222-222222222222"));

    // The structural index registers the clone directly after the last
    // record of its type.
    let config = records(&dir.path().join("Configuration.xml"), "cfg:ChildObjects");
    assert_eq!(
        config,
        vec![
            "Language.Main",
            "Catalog.Items",
            "Catalog.Widgets",
            "Document.Orders"
        ]
    );
    assert_groups_contiguous(&config);

    let dump = records(&dir.path().join("ConfigDumpInfo.xml"), "xr:ChildObjects");
    assert_eq!(
        dump,
        vec!["Catalog.Items", "Catalog.Widgets", "Document.Orders"]
    );
    assert_groups_contiguous(&dump);
}

#[test]
fn test_rerun_is_idempotent() {
    let dir = tempdir().unwrap();
    write_repo(dir.path());

    widgets_job(dir.path()).run().unwrap();
    let config_first = fs::read(dir.path().join("Configuration.xml")).unwrap();
    let dump_first = fs::read(dir.path().join("ConfigDumpInfo.xml")).unwrap();
    let clone_first = fs::read_to_string(dir.path().join("Catalogs/Widgets.xml")).unwrap();

    let second = widgets_job(dir.path()).run().unwrap();
    assert!(second.removed_stale_definition);
    assert_eq!(second.removed_stale_records, 2);

    // Indexes converge byte-for-byte; the clone file differs only in its
    // regenerated identifiers.
    assert_eq!(
        fs::read(dir.path().join("Configuration.xml")).unwrap(),
        config_first
    );
    assert_eq!(
        fs::read(dir.path().join("ConfigDumpInfo.xml")).unwrap(),
        dump_first
    );
    let clone_second = fs::read_to_string(dir.path().join("Catalogs/Widgets.xml")).unwrap();
    assert_ne!(clone_first, clone_second);
    assert_eq!(
        clone_first.matches("<cfg:Name>").count(),
        clone_second.matches("<cfg:Name>").count()
    );
}

#[test]
fn test_first_clone_of_a_type_appends_to_the_collection() {
    let dir = tempdir().unwrap();
    write_repo(dir.path());
    fs::create_dir_all(dir.path().join("Reports")).unwrap();
    fs::write(
        dir.path().join("Reports/Sales.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <cfg:MetaDataObject xmlns:cfg=\"http://v8.example/MDClasses\" \
         xmlns:xr=\"http://v8.example/dumpinfo\">\n\
         \t<cfg:Report uuid=\"aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa\">\n\
         \t\t<cfg:InternalInfo>\n\
         \t\t\t<xr:GeneratedType name=\"ReportObject.Sales\" category=\"Object\">\n\
         \t\t\t\t<xr:TypeId>bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb</xr:TypeId>\n\
         \t\t\t\t<xr:ValueId>cccccccc-cccc-4ccc-8ccc-cccccccccccc</xr:ValueId>\n\
         \t\t\t</xr:GeneratedType>\n\
         \t\t</cfg:InternalInfo>\n\
         \t\t<cfg:Properties>\n\
         \t\t\t<cfg:Name>Sales</cfg:Name>\n\
         \t\t</cfg:Properties>\n\
         \t</cfg:Report>\n\
         </cfg:MetaDataObject>\n",
    )
    .unwrap();

    let job = CloneJob {
        repo: RepoLayout {
            root: dir.path().to_path_buf(),
            type_group: "Reports".to_string(),
        },
        namespaces: NamespaceMap::default(),
        donor: EntityRef::new("Report", "Sales"),
        clone_name: "SalesCopy".to_string(),
    };
    job.run().unwrap();

    // No Report record existed, so the new one lands at the end of each
    // record collection (the documented fallback).
    let config = records(&dir.path().join("Configuration.xml"), "cfg:ChildObjects");
    assert_eq!(config.last().map(String::as_str), Some("Report.SalesCopy"));
    let dump = records(&dir.path().join("ConfigDumpInfo.xml"), "xr:ChildObjects");
    assert_eq!(dump.last().map(String::as_str), Some("Report.SalesCopy"));
}

#[test]
fn test_missing_donor_leaves_the_repository_unchanged() {
    let dir = tempdir().unwrap();
    write_repo(dir.path());
    let config_before = fs::read(dir.path().join("Configuration.xml")).unwrap();
    let dump_before = fs::read(dir.path().join("ConfigDumpInfo.xml")).unwrap();

    let mut job = widgets_job(dir.path());
    job.donor = EntityRef::new("Catalog", "DoesNotExist");
    job.clone_name = "Whatever".to_string();
    assert!(job.run().is_err());

    assert_eq!(
        fs::read(dir.path().join("Configuration.xml")).unwrap(),
        config_before
    );
    assert_eq!(
        fs::read(dir.path().join("ConfigDumpInfo.xml")).unwrap(),
        dump_before
    );
    assert!(!dir.path().join("Catalogs/Whatever.xml").exists());
}
