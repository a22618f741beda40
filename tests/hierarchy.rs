use ferrous_beans::{
    BeanClass, BeanCollection, BeanDefinition, BeanError, Capability, DependencyDescriptor, Resolver,
};
use std::sync::Arc;

struct DataSource {
    url: &'static str,
}

struct Repository {
    source: Arc<DataSource>,
}

fn repository_class() -> Arc<BeanClass> {
    BeanClass::builder::<Repository>()
        .constructor(vec![DependencyDescriptor::of::<DataSource>()], |args| {
            Ok(Repository { source: args.get::<DataSource>(0)? })
        })
        .build()
}

fn parent_factory() -> ferrous_beans::BeanFactory {
    let mut beans = BeanCollection::new();
    beans.add_singleton("dataSource", DataSource { url: "postgres://shared" });
    beans.add_singleton("region", "eu-west".to_string());
    beans.register_alias("ds", "dataSource").unwrap();
    beans.build().unwrap()
}

#[test]
fn test_child_resolves_parent_beans_by_name_and_type() {
    let parent = parent_factory();
    let mut beans = BeanCollection::with_parent(parent.clone());
    beans.register_definition("repository", BeanDefinition::of(repository_class()));
    let child = beans.build().unwrap();

    let repo = child.get_required::<Repository>();
    assert_eq!(repo.source.url, "postgres://shared");

    let from_child = child.get_named::<DataSource>("ds").unwrap();
    let from_parent = parent.get_named::<DataSource>("dataSource").unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_parent));
    assert!(child.contains_bean("dataSource"));
    assert!(!child.contains_definition("dataSource"));
    assert!(child.parent().is_some());
}

#[test]
fn test_local_definition_shadows_parent() {
    let parent = parent_factory();
    let mut beans = BeanCollection::with_parent(parent.clone());
    beans.add_singleton("region", "us-east".to_string());
    let child = beans.build().unwrap();

    assert_eq!(*child.get_named::<String>("region").unwrap(), "us-east");
    assert_eq!(*parent.get_named::<String>("region").unwrap(), "eu-west");
    // Type lookup stays local when a local candidate exists
    assert_eq!(*child.get_required::<String>(), "us-east");
}

#[test]
fn test_collections_merge_child_first_without_shadowed_names() {
    let mut parent_beans = BeanCollection::new();
    parent_beans.add_singleton("a", 1u32);
    parent_beans.add_singleton("b", 2u32);
    let parent = parent_beans.build().unwrap();

    let mut beans = BeanCollection::with_parent(parent);
    beans.add_singleton("b", 20u32);
    beans.add_singleton("c", 30u32);
    let child = beans.build().unwrap();

    let values: Vec<u32> = child.get_all::<u32>().unwrap().iter().map(|v| **v).collect();
    assert_eq!(values, vec![20, 30, 1]);
    assert_eq!(
        child.names_for_capability(&Capability::of::<u32>()),
        vec!["b", "c", "a"]
    );
}

#[test]
fn test_parent_never_sees_child_beans() {
    let parent = parent_factory();
    let mut beans = BeanCollection::with_parent(parent.clone());
    beans.add_singleton("childOnly", 9u8);
    let child = beans.build().unwrap();

    assert!(child.contains_bean("childOnly"));
    assert!(!parent.contains_bean("childOnly"));
    assert!(matches!(parent.get_bean("childOnly"), Err(BeanError::NoSuchBean(_))));
}

#[test]
fn test_missing_everywhere_is_no_such_bean() {
    let child = BeanCollection::with_parent(parent_factory()).build().unwrap();
    assert!(matches!(child.get_bean("nowhere"), Err(BeanError::NoSuchBean(name)) if name == "nowhere"));
    assert!(matches!(child.get::<u64>(), Err(BeanError::NoMatchingBean { .. })));
}

#[test]
fn test_depends_on_parent_bean_passes_validation() {
    let mut beans = BeanCollection::with_parent(parent_factory());
    beans.register_definition(
        "repository",
        BeanDefinition::of(repository_class()).depends_on("dataSource"),
    );
    assert!(beans.validate().is_valid());
    assert!(beans.build().is_ok());
}

#[test]
fn test_closing_child_leaves_parent_open() {
    let parent = parent_factory();
    let child = BeanCollection::with_parent(parent.clone()).build().unwrap();

    child.close().unwrap();
    assert!(!parent.is_closed());
    assert!(parent.get_bean("dataSource").is_ok());
    parent.close().unwrap();
}
