use ferrous_beans::{
    AnyArc, Autowired, BeanClass, BeanCollection, BeanDefinition, BeanError, BeanPostProcessor, BoxError,
    DependencyDescriptor, FactoryConfig, Resolver, ResolverCore, Scope,
};
use std::sync::Arc;

#[derive(Default)]
struct Left {
    right: Autowired<Right>,
}

#[derive(Default)]
struct Right {
    left: Autowired<Left>,
}

fn left_class() -> Arc<BeanClass> {
    BeanClass::builder::<Left>()
        .default_constructor(Left::default)
        .autowired::<Right, _>("right", |l, r| l.right.set(r))
        .build()
}

fn right_class() -> Arc<BeanClass> {
    BeanClass::builder::<Right>()
        .default_constructor(Right::default)
        .autowired::<Left, _>("left", |r, l| r.left.set(l))
        .build()
}

/// Expects the root cause of `err` to be a constructor cycle with `expected` as its chain.
fn assert_constructor_cycle(err: &BeanError, expected: &[&str]) {
    match err.root_cause() {
        BeanError::CircularConstructorDependency { chain } => {
            assert_eq!(chain, expected, "wrong circular path");
        }
        other => panic!("expected constructor cycle, got: {}", other),
    }
}

#[test]
fn test_singleton_property_cycle_resolves() {
    let mut beans = BeanCollection::new();
    beans.register_definition("left", BeanDefinition::of(left_class()));
    beans.register_definition("right", BeanDefinition::of(right_class()));

    let factory = beans.build().unwrap();
    let left = factory.get::<Left>().unwrap();
    let right = factory.get::<Right>().unwrap();

    assert!(Arc::ptr_eq(&left.right.get(), &right));
    assert!(Arc::ptr_eq(&right.left.get(), &left));
}

#[test]
fn test_property_cycle_with_circular_references_disabled() {
    let mut beans = BeanCollection::with_config(FactoryConfig::new().allow_circular_references(false));
    beans.register_definition("left", BeanDefinition::of(left_class()).lazy(true));
    beans.register_definition("right", BeanDefinition::of(right_class()).lazy(true));

    let factory = beans.build().unwrap();
    let err = factory.get_bean("left").unwrap_err();

    assert!(matches!(err.root_cause(), BeanError::CurrentlyInCreation { name } if name == "left"));
    // Nothing half-built is left behind
    assert!(factory.singleton_names().is_empty());
}

#[test]
fn test_self_constructor_dependency() {
    struct SelfReferencing;

    let class = BeanClass::builder::<SelfReferencing>()
        .constructor(vec![DependencyDescriptor::named("selfish")], |_| Ok(SelfReferencing))
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("selfish", BeanDefinition::of(class).lazy(true));
    let factory = beans.build().unwrap();

    let err = factory.get_bean("selfish").unwrap_err();
    assert_constructor_cycle(&err, &["selfish", "selfish"]);
}

#[test]
fn test_two_level_constructor_cycle() {
    struct A {
        _b: Arc<B>,
    }

    struct B {
        _a: Arc<A>,
    }

    let a = BeanClass::builder::<A>()
        .constructor(vec![DependencyDescriptor::of::<B>()], |args| Ok(A { _b: args.get::<B>(0)? }))
        .build();
    let b = BeanClass::builder::<B>()
        .constructor(vec![DependencyDescriptor::of::<A>()], |args| Ok(B { _a: args.get::<A>(0)? }))
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("a", BeanDefinition::of(a));
    beans.register_definition("b", BeanDefinition::of(b));

    // Eager creation surfaces the cycle from build()
    let err = beans.build().unwrap_err();
    assert_constructor_cycle(&err, &["a", "b", "a"]);
    assert!(err.to_string().contains("error creating bean 'a'"));
}

#[test]
fn test_three_level_constructor_cycle() {
    struct A;
    struct B;
    struct C;

    let a = BeanClass::builder::<A>()
        .constructor(vec![DependencyDescriptor::of::<B>()], |_| Ok(A))
        .build();
    let b = BeanClass::builder::<B>()
        .constructor(vec![DependencyDescriptor::of::<C>()], |_| Ok(B))
        .build();
    let c = BeanClass::builder::<C>()
        .constructor(vec![DependencyDescriptor::of::<A>()], |_| Ok(C))
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("a", BeanDefinition::of(a).lazy(true));
    beans.register_definition("b", BeanDefinition::of(b).lazy(true));
    beans.register_definition("c", BeanDefinition::of(c).lazy(true));
    let factory = beans.build().unwrap();

    let err = factory.get_bean("b").unwrap_err();
    assert_constructor_cycle(&err, &["b", "c", "a", "b"]);

    let names: Vec<&str> = err
        .chain()
        .filter_map(|e| match e {
            BeanError::BeanCreation { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["b", "c", "a"]);
}

#[test]
fn test_prototype_cycle_is_currently_in_creation() {
    struct Ping;
    struct Pong;

    let mut beans = BeanCollection::new();
    beans.add_factory::<Ping, _>("ping", Scope::Prototype, |ctx| {
        ctx.get::<Pong>()?;
        Ok(Ping)
    });
    beans.add_factory::<Pong, _>("pong", Scope::Prototype, |ctx| {
        ctx.get::<Ping>()?;
        Ok(Pong)
    });
    let factory = beans.build().unwrap();

    let err = factory.get_bean("ping").unwrap_err();
    assert!(matches!(err.root_cause(), BeanError::CurrentlyInCreation { name } if name == "ping"));
}

#[test]
fn test_self_reference_is_not_an_autowire_candidate() {
    // A bean asking for its own type sees only the other candidates
    struct Node {
        next: Option<Arc<Node>>,
    }

    let class = BeanClass::builder::<Node>()
        .constructor(vec![DependencyDescriptor::of::<Node>().optional()], |args| {
            Ok(Node { next: args.optional::<Node>(0)? })
        })
        .build();

    let mut beans = BeanCollection::new();
    beans.register_definition("head", BeanDefinition::of(class).lazy(true));
    let factory = beans.build().unwrap();

    let head = factory.get_named::<Node>("head").unwrap();
    assert!(head.next.is_none());
}

#[test]
fn test_replaced_early_reference_is_irreconcilable() {
    struct Wrapper;

    // Replaces `left` after initialization even though `right` already holds it
    struct Proxying;
    impl BeanPostProcessor for Proxying {
        fn post_process_after_initialization(&self, bean: AnyArc, name: &str) -> Result<AnyArc, BoxError> {
            if name == "left" {
                Ok(Arc::new(Wrapper))
            } else {
                Ok(bean)
            }
        }
    }

    let mut beans = BeanCollection::new();
    beans.add_post_processor(Arc::new(Proxying));
    beans.register_definition("left", BeanDefinition::of(left_class()).lazy(true));
    beans.register_definition("right", BeanDefinition::of(right_class()).lazy(true));
    let factory = beans.build().unwrap();

    let err = factory.get_bean("left").unwrap_err();
    assert!(matches!(err.root_cause(), BeanError::IrreconcilableEarlyReference { name } if name == "left"));
    // `right` captured the stale reference and was discarded with it
    assert!(!factory.singleton_names().contains(&"right".to_string()));
}

#[test]
fn test_depends_on_cycle_rejected_by_validation() {
    let mut beans = BeanCollection::new();
    beans.register_definition("a", BeanDefinition::of(BeanClass::builder::<u8>().build()).depends_on("b"));
    beans.register_definition("b", BeanDefinition::of(BeanClass::builder::<u16>().build()).depends_on("a"));

    match beans.build() {
        Err(BeanError::Validation(errors)) => {
            assert!(errors
                .iter()
                .any(|e| e.to_string().contains("circular depends-on relationship")));
        }
        other => panic!("expected validation failure, got {:?}", other.err()),
    }
}

#[test]
fn test_max_resolution_depth() {
    struct Deep;

    let mut beans = BeanCollection::with_config(FactoryConfig::new().max_resolution_depth(3));
    for i in 0..5 {
        let next = format!("bean{}", i + 1);
        beans.add_factory::<Deep, _>(format!("bean{}", i), Scope::Prototype, move |ctx| {
            if ctx.factory().contains_bean(&next) {
                ctx.resolve_named(&next)?;
            }
            Ok(Deep)
        });
    }
    let factory = beans.build().unwrap();

    let err = factory.get_bean("bean0").unwrap_err();
    assert!(matches!(err.root_cause(), BeanError::DepthExceeded(3)));
    assert!(factory.get_bean("bean3").is_ok());
}
