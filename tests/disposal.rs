use ferrous_beans::{
    AnyArc, BeanClass, BeanCollection, BeanDefinition, BeanError, BeanResult, BoxError, Capability, DependencyDescriptor,
    DestructionAwareBeanPostProcessor, DisposableBean, FactoryConfig, Resolver, Scope, DESTROY,
};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Resource {
    name: &'static str,
    log: Log,
    fail: bool,
}

impl DisposableBean for Resource {
    fn destroy(&self) -> Result<(), BoxError> {
        self.log.lock().unwrap().push(format!("destroy:{}", self.name));
        if self.fail {
            return Err(format!("{} refused to close", self.name).into());
        }
        Ok(())
    }
}

fn resource_class(name: &'static str, log: &Log, fail: bool) -> Arc<BeanClass> {
    let log = log.clone();
    BeanClass::builder::<Resource>()
        .default_constructor(move || Resource { name, log: log.clone(), fail })
        .disposable()
        .build()
}

#[test]
fn test_singletons_destroyed_in_reverse_creation_order() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition("first", BeanDefinition::of(resource_class("first", &log, false)));
    beans.register_definition("second", BeanDefinition::of(resource_class("second", &log, false)));
    beans.register_definition("third", BeanDefinition::of(resource_class("third", &log, false)));

    let factory = beans.build().unwrap();
    factory.close().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["destroy:third", "destroy:second", "destroy:first"]
    );
}

#[test]
fn test_dependents_destroyed_before_dependencies() {
    let log: Log = Arc::default();

    struct Service {
        _pool: Arc<Resource>,
        log: Log,
    }
    impl DisposableBean for Service {
        fn destroy(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push("destroy:service".to_string());
            Ok(())
        }
    }

    let service_log = log.clone();
    let service = BeanClass::builder::<Service>()
        .constructor(vec![DependencyDescriptor::named("pool")], move |args| {
            Ok(Service { _pool: args.get::<Resource>(0)?, log: service_log.clone() })
        })
        .disposable()
        .build();

    let mut beans = BeanCollection::new();
    // Registered first, but needs the pool, which therefore completes first
    beans.register_definition("service", BeanDefinition::of(service));
    beans.register_definition("pool", BeanDefinition::of(resource_class("pool", &log, false)).lazy(true));

    let factory = beans.build().unwrap();
    assert_eq!(factory.singleton_names(), vec!["pool", "service"]);
    factory.close().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["destroy:service", "destroy:pool"]);
}

#[test]
fn test_every_destroy_hook_runs_and_failures_are_aggregated() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition("a", BeanDefinition::of(resource_class("a", &log, true)));
    beans.register_definition("b", BeanDefinition::of(resource_class("b", &log, false)));
    beans.register_definition("c", BeanDefinition::of(resource_class("c", &log, true)));

    let factory = beans.build().unwrap();
    match factory.close() {
        Err(BeanError::Destruction(errors)) => {
            assert_eq!(errors.len(), 2);
            assert_eq!(errors.bean_names(), vec!["c", "a"]);
            assert!(errors.to_string().contains("c refused to close"));
        }
        other => panic!("expected destruction errors, got {:?}", other),
    }
    assert_eq!(*log.lock().unwrap(), vec!["destroy:c", "destroy:b", "destroy:a"]);
}

#[test]
fn test_close_is_idempotent_and_blocks_lookups() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition("pool", BeanDefinition::of(resource_class("pool", &log, false)));

    let factory = beans.build().unwrap();
    factory.close().unwrap();
    factory.close().unwrap();

    assert!(factory.is_closed());
    assert_eq!(log.lock().unwrap().len(), 1);
    assert!(matches!(factory.get_bean("pool"), Err(BeanError::ContainerClosed)));
    assert!(matches!(factory.get::<Resource>(), Err(BeanError::ContainerClosed)));

    let closed = |result: BeanResult<()>| matches!(result, Err(BeanError::ContainerClosed));
    assert!(closed(factory.definition("pool").map(|_| ())));
    assert!(closed(factory.is_singleton("pool").map(|_| ())));
    assert!(closed(factory.is_prototype("pool").map(|_| ())));
    assert!(closed(factory.get_type("pool").map(|_| ())));
    assert!(closed(factory.is_type_match("pool", &Capability::of::<Resource>()).map(|_| ())));
    assert!(closed(factory.destroy_scoped_bean("pool")));
    assert!(closed(factory.destroy_bean("pool", &(Arc::new(0u8) as AnyArc))));
    assert!(closed(factory.get_bean_with_args("pool", Vec::new()).map(|_| ())));
}

#[test]
fn test_named_destroy_method_runs_after_disposable() {
    struct Conn {
        log: Log,
    }
    impl DisposableBean for Conn {
        fn destroy(&self) -> Result<(), BoxError> {
            self.log.lock().unwrap().push("disposable".to_string());
            Ok(())
        }
    }

    let l = log_for_test();
    let log = l.clone();
    let class = BeanClass::builder::<Conn>()
        .default_constructor(move || Conn { log: log.clone() })
        .disposable()
        .destroy_method("shutdown", |c| {
            c.log.lock().unwrap().push("shutdown".to_string());
            Ok(())
        })
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("conn", BeanDefinition::of(class).destroy_method("shutdown"));
    beans.build().unwrap().close().unwrap();

    assert_eq!(*l.lock().unwrap(), vec!["disposable", "shutdown"]);
}

#[test]
fn test_destroy_method_named_like_disposable_hook_runs_once() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition(
        "pool",
        BeanDefinition::of(resource_class("pool", &log, false)).destroy_method(DESTROY),
    );
    beans.build().unwrap().close().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["destroy:pool"]);
}

#[test]
fn test_destruction_aware_processor_runs_first() {
    let log: Log = Arc::default();

    struct Announcer(Log);
    impl DestructionAwareBeanPostProcessor for Announcer {
        fn post_process_before_destruction(&self, _bean: &AnyArc, name: &str) -> Result<(), BoxError> {
            self.0.lock().unwrap().push(format!("before:{}", name));
            Ok(())
        }

        fn requires_destruction(&self, bean: &AnyArc) -> bool {
            bean.is::<Resource>()
        }
    }

    let mut beans = BeanCollection::new();
    beans.add_destruction_processor(Arc::new(Announcer(log.clone())));
    beans.register_definition("pool", BeanDefinition::of(resource_class("pool", &log, false)));
    beans.add_singleton("plain", 7u8);
    beans.build().unwrap().close().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["before:pool", "destroy:pool"]);
}

#[test]
fn test_prototypes_are_not_destroyed_by_default() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition(
        "conn",
        BeanDefinition::of(resource_class("conn", &log, false)).scope(Scope::Prototype),
    );

    let factory = beans.build().unwrap();
    let conn = factory.get_bean("conn").unwrap();
    factory.close().unwrap();
    assert!(log.lock().unwrap().is_empty());

    // The caller owns the prototype and may destroy it explicitly
    factory.destroy_bean("conn", &conn).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["destroy:conn"]);
}

#[test]
fn test_tracked_prototypes_destroyed_on_close() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::with_config(FactoryConfig::new().track_prototype_destruction(true));
    beans.register_definition(
        "conn",
        BeanDefinition::of(resource_class("conn", &log, false)).scope(Scope::Prototype),
    );
    beans.register_definition("pool", BeanDefinition::of(resource_class("pool", &log, false)));

    let factory = beans.build().unwrap();
    factory.get_bean("conn").unwrap();
    factory.get_bean("conn").unwrap();
    factory.close().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["destroy:pool", "destroy:conn", "destroy:conn"]
    );
}

#[test]
fn test_failed_eager_creation_destroys_already_created_singletons() {
    let log: Log = Arc::default();
    let mut beans = BeanCollection::new();
    beans.register_definition("pool", BeanDefinition::of(resource_class("pool", &log, false)));
    beans.add_singleton_factory::<u8, _>("broken", |_| Err("boom".into()));

    let err = beans.build().unwrap_err();
    assert!(matches!(err, BeanError::BeanCreation { ref name, .. } if name == "broken"));
    assert_eq!(*log.lock().unwrap(), vec!["destroy:pool"]);
}

fn log_for_test() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}
