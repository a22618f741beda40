/// Concurrent resolution tests
///
/// Lazy singletons must be created exactly once no matter how many threads
/// race for them, and cross-thread creation must never deadlock.

use ferrous_beans::{
    BeanClass, BeanCollection, BeanDefinition, BeanError, BoxError, DependencyDescriptor, DisposableBean, FactoryBean,
    MapScope, Resolver, Scope,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Slow {
    serial: usize,
}

fn slow_class(created: &Arc<AtomicUsize>) -> Arc<BeanClass> {
    let created = created.clone();
    BeanClass::builder::<Slow>()
        .default_constructor(move || {
            std::thread::sleep(Duration::from_millis(20));
            Slow { serial: created.fetch_add(1, Ordering::SeqCst) }
        })
        .build()
}

#[test]
fn test_lazy_singleton_created_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let mut beans = BeanCollection::new();
    beans.register_definition("slow", BeanDefinition::of(slow_class(&created)).lazy(true));
    let factory = beans.build().unwrap();

    let instances: Vec<Arc<Slow>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|_| factory.get_required::<Slow>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    assert_eq!(instances[0].serial, 0);
}

#[test]
fn test_prototypes_are_independent_across_threads() {
    let created = Arc::new(AtomicUsize::new(0));
    let mut beans = BeanCollection::new();
    beans.register_definition("slow", BeanDefinition::of(slow_class(&created)).scope(Scope::Prototype));
    let factory = beans.build().unwrap();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                let a = factory.get_required::<Slow>();
                let b = factory.get_required::<Slow>();
                assert!(!Arc::ptr_eq(&a, &b));
            });
        }
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 8);
}

#[test]
fn test_shared_dependency_built_once_for_concurrent_dependents() {
    struct Consumer {
        slow: Arc<Slow>,
    }

    let created = Arc::new(AtomicUsize::new(0));
    let mut beans = BeanCollection::new();
    beans.register_definition("slow", BeanDefinition::of(slow_class(&created)).lazy(true));
    for index in 0..4 {
        let class = BeanClass::builder::<Consumer>()
            .constructor(vec![DependencyDescriptor::of::<Slow>()], |args| {
                Ok(Consumer { slow: args.get::<Slow>(0)? })
            })
            .build();
        beans.register_definition(format!("consumer{}", index), BeanDefinition::of(class).lazy(true));
    }
    let factory = beans.build().unwrap();

    let consumers: Vec<Arc<Consumer>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|index| {
                let factory = &factory;
                s.spawn(move |_| factory.get_named::<Consumer>(&format!("consumer{}", index)).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(consumers.iter().all(|c| Arc::ptr_eq(&c.slow, &consumers[0].slow)));
    let mut dependents = factory.dependents_of("slow");
    dependents.sort();
    assert_eq!(dependents, vec!["consumer0", "consumer1", "consumer2", "consumer3"]);
}

#[test]
fn test_concurrent_lookup_after_close_fails_cleanly() {
    let mut beans = BeanCollection::new();
    beans.add_singleton("value", 5u32);
    let factory = beans.build().unwrap();
    factory.close().unwrap();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| assert!(factory.get::<u32>().is_err()));
        }
    })
    .unwrap();
}

struct Pool {
    serial: usize,
}

struct PoolFactory {
    built: Arc<AtomicUsize>,
}

impl FactoryBean for PoolFactory {
    type Object = Pool;

    fn get_object(&self) -> Result<Arc<Pool>, BoxError> {
        std::thread::sleep(Duration::from_millis(50));
        Ok(Arc::new(Pool { serial: self.built.fetch_add(1, Ordering::SeqCst) }))
    }
}

#[test]
fn test_factory_product_created_once_under_contention() {
    let built = Arc::new(AtomicUsize::new(0));
    let b = built.clone();
    let class = BeanClass::builder::<PoolFactory>()
        .default_constructor(move || PoolFactory { built: b.clone() })
        .factory_bean(BeanClass::builder::<Pool>())
        .build();
    let mut beans = BeanCollection::new();
    beans.register_definition("pool", BeanDefinition::of(class));
    let factory = beans.build().unwrap();
    assert!(factory.is_singleton("pool").unwrap());

    let pools: Vec<Arc<Pool>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|_| factory.get_named::<Pool>("pool").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(pools.iter().all(|p| Arc::ptr_eq(p, &pools[0])));
    assert_eq!(pools[0].serial, 0);
}

struct Session {
    closed: Arc<AtomicUsize>,
}

impl DisposableBean for Session {
    fn destroy(&self) -> Result<(), BoxError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn session_class(created: &Arc<AtomicUsize>, closed: &Arc<AtomicUsize>, delay: Duration) -> Arc<BeanClass> {
    let created = created.clone();
    let closed = closed.clone();
    BeanClass::builder::<Session>()
        .default_constructor(move || {
            std::thread::sleep(delay);
            created.fetch_add(1, Ordering::SeqCst);
            Session { closed: closed.clone() }
        })
        .disposable()
        .build()
}

#[test]
fn test_scoped_bean_created_once_under_contention() {
    let created = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let request = Arc::new(MapScope::new());
    let mut beans = BeanCollection::new();
    beans.register_scope("request", request.clone());
    beans.register_definition(
        "session",
        BeanDefinition::of(session_class(&created, &closed, Duration::from_millis(30))).scope(Scope::custom("request")),
    );
    let factory = beans.build().unwrap();

    let sessions: Vec<Arc<Session>> = crossbeam_utils::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|_| factory.get_required::<Session>())).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(sessions.iter().all(|x| Arc::ptr_eq(x, &sessions[0])));
    assert_eq!(request.len(), 1);

    request.clear().unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_singleton_finishing_after_close_is_destroyed() {
    let created = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let mut beans = BeanCollection::new();
    beans.register_definition(
        "session",
        BeanDefinition::of(session_class(&created, &closed, Duration::from_millis(100))).lazy(true),
    );
    let factory = beans.build().unwrap();

    let lookup = crossbeam_utils::thread::scope(|s| {
        let handle = s.spawn(|_| factory.get::<Session>());
        std::thread::sleep(Duration::from_millis(20));
        factory.close().unwrap();
        handle.join().unwrap()
    })
    .unwrap();

    assert!(matches!(lookup, Err(BeanError::ContainerClosed)));
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert!(factory.singleton_names().is_empty());
}
