use ferrous_beans::{
    BeanClass, BeanCollection, BeanDefinition, BeanError, BoxError, Capability, DependencyDescriptor, FactoryBean,
    Resolver, Scope, Value, FACTORY_BEAN_PREFIX,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Client: Send + Sync {
    fn endpoint(&self) -> String;
}

struct HttpClient {
    endpoint: String,
    serial: usize,
}

impl Client for HttpClient {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

struct ClientFactory {
    produced: AtomicUsize,
    shared: bool,
}

impl FactoryBean for ClientFactory {
    type Object = HttpClient;

    fn get_object(&self) -> Result<Arc<HttpClient>, BoxError> {
        let serial = self.produced.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(HttpClient { endpoint: "https://api.local".to_string(), serial }))
    }

    fn is_singleton(&self) -> bool {
        self.shared
    }
}

fn client_factory_class(shared: bool) -> Arc<BeanClass> {
    BeanClass::builder::<ClientFactory>()
        .default_constructor(move || ClientFactory { produced: AtomicUsize::new(0), shared })
        .factory_bean(BeanClass::builder::<HttpClient>().provides::<dyn Client>(|c| c))
        .build()
}

#[test]
fn test_name_returns_product_and_prefix_returns_factory() {
    let mut beans = BeanCollection::new();
    beans.register_definition("client", BeanDefinition::of(client_factory_class(true)));
    let factory = beans.build().unwrap();

    let product = factory.get_named::<HttpClient>("client").unwrap();
    assert_eq!(product.endpoint, "https://api.local");

    let raw = factory.get_bean(&format!("{}client", FACTORY_BEAN_PREFIX)).unwrap();
    let client_factory = raw.downcast_ref::<ClientFactory>().unwrap();
    assert_eq!(client_factory.produced.load(Ordering::SeqCst), 1);

    assert!(matches!(
        factory.get_named::<ClientFactory>("client"),
        Err(BeanError::TypeMismatch { .. })
    ));
}

#[test]
fn test_factory_is_eager_but_product_is_lazy() {
    let mut beans = BeanCollection::new();
    beans.register_definition("client", BeanDefinition::of(client_factory_class(true)));
    let factory = beans.build().unwrap();

    let raw = factory.get_bean("&client").unwrap();
    assert_eq!(raw.downcast_ref::<ClientFactory>().unwrap().produced.load(Ordering::SeqCst), 0);
    assert_eq!(factory.singleton_names(), vec!["client"]);
}

#[test]
fn test_singleton_product_is_cached() {
    let mut beans = BeanCollection::new();
    beans.register_definition("client", BeanDefinition::of(client_factory_class(true)));
    let factory = beans.build().unwrap();

    let a = factory.get_named::<HttpClient>("client").unwrap();
    let b = factory.get_named::<HttpClient>("client").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(factory.is_singleton("client").unwrap());
}

#[test]
fn test_non_singleton_product_is_recreated() {
    let mut beans = BeanCollection::new();
    beans.register_definition("client", BeanDefinition::of(client_factory_class(false)));
    let factory = beans.build().unwrap();

    let a = factory.get_named::<HttpClient>("client").unwrap();
    let b = factory.get_named::<HttpClient>("client").unwrap();
    assert_eq!((a.serial, b.serial), (0, 1));
    assert!(!factory.is_singleton("client").unwrap());
    assert!(factory.is_prototype("client").unwrap());
    // The factory itself is still a singleton
    assert!(factory.is_singleton("&client").unwrap());
}

#[test]
fn test_type_resolution_matches_product_capabilities() {
    struct Gateway {
        client: Arc<dyn Client>,
    }

    let gateway = BeanClass::builder::<Gateway>()
        .constructor(vec![DependencyDescriptor::of_trait::<dyn Client>()], |args| {
            Ok(Gateway { client: args.get_trait::<dyn Client>(0)? })
        })
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("client", BeanDefinition::of(client_factory_class(true)));
    beans.register_definition("gateway", BeanDefinition::of(gateway));
    let factory = beans.build().unwrap();

    assert_eq!(factory.get_required::<Gateway>().client.endpoint(), "https://api.local");
    assert!(factory.get_optional::<ClientFactory>().unwrap().is_none());
    assert_eq!(factory.names_for_capability(&Capability::of_trait::<dyn Client>()), vec!["client"]);
    assert!(factory
        .get_type("&client")
        .unwrap()
        .contains(&Capability::of::<ClientFactory>()));
}

#[test]
fn test_prefix_on_plain_bean_is_rejected() {
    let mut beans = BeanCollection::new();
    beans.add_singleton("plain", 5u32);
    let factory = beans.build().unwrap();

    assert!(matches!(factory.get_bean("&plain"), Err(BeanError::NotAFactoryBean(name)) if name == "plain"));
}

struct Pool {
    size: usize,
}

struct PoolConfig {
    size: usize,
}

impl PoolConfig {
    fn pool(&self) -> Pool {
        Pool { size: self.size }
    }
}

#[test]
fn test_instance_factory_method() {
    let config = BeanClass::builder::<PoolConfig>()
        .default_constructor(|| PoolConfig { size: 8 })
        .factory_method::<Pool, _>("pool", Vec::new(), |config, _| Ok(config.pool()))
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("poolConfig", BeanDefinition::of(config));
    beans.register_definition("pool", BeanDefinition::new().factory_bean_method("poolConfig", "pool"));
    let factory = beans.build().unwrap();

    assert_eq!(factory.get_required::<Pool>().size, 8);
    assert_eq!(factory.dependents_of("poolConfig"), vec!["pool"]);
}

fn pool_config_class(size: usize) -> Arc<BeanClass> {
    BeanClass::builder::<PoolConfig>()
        .default_constructor(move || PoolConfig { size })
        .factory_method::<Pool, _>("pool", Vec::new(), |config, _| Ok(config.pool()))
        .build()
}

#[test]
fn test_instance_factory_method_through_alias_is_typed() {
    let mut beans = BeanCollection::new();
    beans.register_definition("poolConfig", BeanDefinition::of(pool_config_class(4)));
    beans.register_alias("settings", "poolConfig").unwrap();
    beans.register_definition("pool", BeanDefinition::new().factory_bean_method("settings", "pool"));
    let validation = beans.validate();
    assert!(!validation.has_warnings(), "{}", validation.format_issues());
    let factory = beans.build().unwrap();

    assert!(factory.is_type_match("pool", &Capability::of::<Pool>()).unwrap());
    assert_eq!(factory.get_required::<Pool>().size, 4);
}

#[test]
fn test_instance_factory_method_on_parent_bean_is_typed() {
    let mut parent = BeanCollection::new();
    parent.register_definition("poolConfig", BeanDefinition::of(pool_config_class(16)));
    let parent = parent.build().unwrap();

    let mut beans = BeanCollection::with_parent(parent);
    beans.register_definition("pool", BeanDefinition::new().factory_bean_method("poolConfig", "pool"));
    assert!(!beans.validate().has_warnings());
    let factory = beans.build().unwrap();

    assert_eq!(factory.get_required::<Pool>().size, 16);
}

#[test]
fn test_unknown_factory_product_class_is_a_warning() {
    struct Opaque;

    let mut parent = BeanCollection::new();
    parent.add_singleton("opaque", Opaque);
    let parent = parent.build().unwrap();

    let mut beans = BeanCollection::with_parent(parent);
    beans.register_definition("pool", BeanDefinition::new().factory_bean_method("opaque", "pool"));
    let validation = beans.validate();
    assert!(validation.is_valid());
    assert!(validation.format_issues().contains("class of bean 'pool' cannot be determined"));
}

#[test]
fn test_static_factory_method_with_overloads() {
    let class = BeanClass::builder::<PoolConfig>()
        .static_factory::<Pool, _>("create", Vec::new(), |_| Ok(Pool { size: 1 }))
        .static_factory::<Pool, _>("create", vec![DependencyDescriptor::of::<usize>()], |args| {
            Ok(Pool { size: *args.get::<usize>(0)? })
        })
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("pool", BeanDefinition::of(class.clone()).factory_method("create"));
    let factory = beans.build().unwrap();
    // No usize bean: the greedy overload is skipped
    assert_eq!(factory.get_required::<Pool>().size, 1);

    let mut beans = BeanCollection::new();
    beans.add_singleton("size", 32usize);
    beans.register_definition("pool", BeanDefinition::of(class.clone()).factory_method("create"));
    let factory = beans.build().unwrap();
    assert_eq!(factory.get_required::<Pool>().size, 32);

    let mut beans = BeanCollection::new();
    beans.register_definition(
        "pool",
        BeanDefinition::of(class)
            .factory_method("create")
            .constructor_arg(0, Value::literal(4usize)),
    );
    let factory = beans.build().unwrap();
    assert_eq!(factory.get_required::<Pool>().size, 4);
}

#[test]
fn test_prototype_factory_method_with_runtime_args() {
    let class = BeanClass::builder::<PoolConfig>()
        .static_factory::<Pool, _>("create", vec![DependencyDescriptor::of::<usize>()], |args| {
            Ok(Pool { size: *args.get::<usize>(0)? })
        })
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition(
        "pool",
        BeanDefinition::of(class).factory_method("create").scope(Scope::Prototype),
    );
    let factory = beans.build().unwrap();

    let pool = factory.get_bean_with_args("pool", vec![Value::literal(16usize)]).unwrap();
    assert_eq!(pool.downcast_ref::<Pool>().unwrap().size, 16);

    assert!(matches!(
        factory.get_bean_with_args("pool", vec![Value::literal(1usize), Value::literal(2usize)]),
        Err(BeanError::BeanCreation { .. })
    ));
}

#[test]
fn test_unknown_static_factory_method_fails_validation() {
    let class = BeanClass::builder::<PoolConfig>().build();
    let mut beans = BeanCollection::new();
    beans.register_definition("pool", BeanDefinition::of(class).factory_method("missing"));

    assert!(matches!(beans.build(), Err(BeanError::Validation(errors)) if errors.len() == 1));
}
