/// Tests for modular bean registration
///
/// Covers the BeanModule trait, the by-value and in-place extension traits
/// and external definition sources.
use ferrous_beans::{
    BeanClass, BeanCollection, BeanCollectionExt, BeanCollectionModuleExt, BeanDefinition, BeanError,
    BeanModule, BeanResult, DefinitionSource, DependencyDescriptor, FactoryConfig, Resolver, Scope,
    ValidationWarning,
};
use std::sync::Arc;

// ===== Test Beans =====

#[derive(Debug, Clone)]
struct Config {
    name: String,
    value: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self { name: "test-config".to_string(), value: 42 }
    }
}

struct DatabaseService {
    config: Arc<Config>,
    connection_id: String,
}

struct CacheService {
    cache_size: usize,
}

struct BusinessService {
    db: Arc<DatabaseService>,
    cache: Arc<CacheService>,
}

impl BusinessService {
    fn process(&self) -> String {
        format!(
            "Data from {} ({}) | cache size {}",
            self.db.config.name, self.db.connection_id, self.cache.cache_size
        )
    }
}

// ===== Modules =====

struct DatabaseModule;

impl BeanModule for DatabaseModule {
    fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
        beans.add_singleton_factory::<DatabaseService, _>("database", |ctx| {
            let config = ctx.get::<Config>()?;
            Ok(DatabaseService { connection_id: format!("conn-{}", config.value), config })
        });
        Ok(())
    }
}

struct CacheModule {
    cache_size: usize,
}

impl BeanModule for CacheModule {
    fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
        beans.add_singleton("cache", CacheService { cache_size: self.cache_size });
        Ok(())
    }
}

struct BusinessModule;

impl BeanModule for BusinessModule {
    fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
        let class = BeanClass::builder::<BusinessService>()
            .constructor(
                vec![DependencyDescriptor::of::<DatabaseService>(), DependencyDescriptor::of::<CacheService>()],
                |args| Ok(BusinessService { db: args.get(0)?, cache: args.get(1)? }),
            )
            .build();
        beans.register_definition("business", BeanDefinition::of(class).scope(Scope::Prototype));
        Ok(())
    }
}

// ===== Tests =====

#[test]
fn test_bean_module_registration() {
    let mut beans = BeanCollection::new();
    beans.add_singleton("config", Config::default());
    beans.add_module_mut(DatabaseModule).unwrap();
    beans.add_module_mut(CacheModule { cache_size: 200 }).unwrap();
    beans.add_module_mut(BusinessModule).unwrap();

    let factory = beans.build().unwrap();
    let result = factory.get_required::<BusinessService>().process();

    assert!(result.contains("test-config"));
    assert!(result.contains("conn-42"));
    assert!(result.contains("cache size 200"));
}

#[test]
fn test_owned_self_module_chaining() {
    let mut beans = BeanCollection::new();
    beans.add_singleton("config", Config { name: "chained".to_string(), value: 7 });
    let factory = beans
        .add_module(DatabaseModule)
        .unwrap()
        .add_module(CacheModule { cache_size: 150 })
        .unwrap()
        .add_module(BusinessModule)
        .unwrap()
        .build()
        .unwrap();

    let a = factory.get_required::<BusinessService>();
    let b = factory.get_required::<BusinessService>();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.db, &b.db));
    assert!(a.process().contains("conn-7"));
}

#[test]
fn test_module_registration_error_propagation() {
    struct FailingModule;

    impl BeanModule for FailingModule {
        fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
            beans.register_alias("primaryDb", "replicaDb")?;
            beans.register_alias("replicaDb", "primaryDb")?;
            Ok(())
        }
    }

    let mut beans = BeanCollection::new();
    let result = beans.add_module_mut(FailingModule);
    assert!(matches!(result, Err(BeanError::AliasCycle(_))));
}

#[test]
fn test_later_module_overrides_definition() {
    struct First;
    struct Second;

    impl BeanModule for First {
        fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
            beans.add_singleton("cache", CacheService { cache_size: 100 });
            Ok(())
        }
    }

    impl BeanModule for Second {
        fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
            beans.add_singleton("cache", CacheService { cache_size: 200 });
            Ok(())
        }
    }

    let mut beans = BeanCollection::new();
    beans.add_module_mut(First).unwrap();
    beans.add_module_mut(Second).unwrap();

    let validation = beans.validate();
    assert!(validation.is_valid());
    assert_eq!(
        validation.warnings,
        vec![ValidationWarning::DefinitionOverridden { name: "cache".to_string() }]
    );

    let factory = beans.build().unwrap();
    assert_eq!(factory.get_required::<CacheService>().cache_size, 200);
}

#[test]
fn test_overriding_rejected_when_disabled() {
    let mut beans = BeanCollection::with_config(FactoryConfig::default().allow_definition_overriding(false));
    beans.add_singleton("cache", CacheService { cache_size: 1 });
    beans.add_singleton("cache", CacheService { cache_size: 2 });

    assert!(matches!(beans.build(), Err(BeanError::Validation(errors)) if errors.len() == 1));
}

// ===== Definition sources =====

struct StaticSource {
    definitions: Vec<(&'static str, u32)>,
    aliases: Vec<(&'static str, &'static str)>,
    reject: bool,
}

impl DefinitionSource for StaticSource {
    fn definitions(&self) -> Vec<(String, BeanDefinition)> {
        self.definitions
            .iter()
            .map(|(name, value)| {
                let value = *value;
                let class = BeanClass::builder::<u32>().default_constructor(move || value).build();
                (name.to_string(), BeanDefinition::of(class))
            })
            .collect()
    }

    fn aliases(&self) -> Vec<(String, String)> {
        self.aliases
            .iter()
            .map(|(alias, target)| (alias.to_string(), target.to_string()))
            .collect()
    }

    fn validate(&self) -> BeanResult<()> {
        if self.reject {
            return Err(BeanError::InvalidDefinition {
                name: "static".to_string(),
                reason: "source rejected its own content".to_string(),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "static test source".to_string()
    }
}

#[test]
fn test_definition_source_registers_definitions_and_aliases() {
    let mut beans = BeanCollection::new();
    beans
        .add_source(Box::new(StaticSource {
            definitions: vec![("timeout", 30), ("retries", 3)],
            aliases: vec![("maxRetries", "retries")],
            reject: false,
        }))
        .unwrap();
    let factory = beans.build().unwrap();

    assert_eq!(factory.definition_names(), vec!["timeout", "retries"]);
    assert_eq!(*factory.get_named::<u32>("maxRetries").unwrap(), 3);
    assert_eq!(factory.get_aliases("retries"), vec!["maxRetries"]);
}

#[test]
fn test_definition_source_validation_joins_startup_errors() {
    let mut beans = BeanCollection::new();
    beans
        .add_source(Box::new(StaticSource { definitions: vec![("timeout", 30)], aliases: Vec::new(), reject: true }))
        .unwrap();
    beans.add_factory::<u8, _>("orphan", "nowhere", |_| Ok(0));

    let result = beans.validate();
    assert_eq!(result.errors.len(), 2);
    assert!(result.format_issues().contains("source rejected its own content"));

    match beans.build() {
        Err(BeanError::Validation(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation failure, got {:?}", other.map(|f| f.display_name().to_string())),
    }
}

#[test]
fn test_definition_source_alias_cycle_fails_on_add() {
    let mut beans = BeanCollection::new();
    let result = beans.add_source(Box::new(StaticSource {
        definitions: Vec::new(),
        aliases: vec![("a", "b"), ("b", "a")],
        reject: false,
    }));
    assert!(matches!(result, Err(BeanError::AliasCycle(_))));
}
