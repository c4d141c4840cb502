use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_cache_is_idempotent() {
    let mut cache = TemplateCache::new();
    let key = TemplateKey::new(SymbolId::new(3), [TemplateArg::Value(4)]);
    assert_eq!(cache.lookup(&key), None);
    let first = cache.insert(key.clone(), Instance::Function(FuncId::new(7)));
    let second = cache.insert(key.clone(), Instance::Function(FuncId::new(8)));
    assert_eq!(first, second);
    assert_eq!(cache.lookup(&key), Some(Instance::Function(FuncId::new(7))));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_keys_differ_by_arguments() {
    let mut cache = TemplateCache::new();
    let four = TemplateKey::new(SymbolId::new(0), [TemplateArg::Value(4)]);
    let eight = TemplateKey::new(SymbolId::new(0), [TemplateArg::Value(8)]);
    let typed = TemplateKey::new(SymbolId::new(0), [TemplateArg::Type(TypeId::new(4))]);
    cache.insert(four.clone(), Instance::Type(TypeId::new(10)));
    cache.insert(eight.clone(), Instance::Type(TypeId::new(11)));
    assert_ne!(four, eight);
    assert_ne!(four, typed);
    assert_eq!(cache.lookup(&typed), None);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_update_replaces_provisional_entry() {
    let mut cache = TemplateCache::new();
    let key = TemplateKey::new(SymbolId::new(1), [TemplateArg::Type(TypeId::FLOAT)]);
    cache.insert(key.clone(), Instance::Function(FuncId::new(2)));
    cache.update(&key, Instance::Failed);
    assert_eq!(cache.lookup(&key), Some(Instance::Failed));
}

#[test]
fn test_instance_name() {
    let types = TypeRegistry::new();
    let key = TemplateKey::new(
        SymbolId::new(0),
        [TemplateArg::Type(TypeId::FLOAT), TemplateArg::Value(4)],
    );
    assert_eq!(key.instance_name("Buffer", &types), "Buffer<float, 4>");
    let key = TemplateKey::new(SymbolId::new(0), [TemplateArg::Value(-2)]);
    assert_eq!(key.instance_name("makeSpan", &types), "makeSpan<-2>");
}
