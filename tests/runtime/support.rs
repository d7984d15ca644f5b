//! A catalog concept behind a gateway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use concord_engine::{ActionSignature, Concept, ConceptRegistry, Engine, Pattern, Rule, RuleRegistry, Template, vars};
use concord_foundation::{Record, Result, record};
use concord_runtime::{Gateway, GatewayConfig, Requesting};

/// `addItem(title) -> {item}`, `_list() -> [{item, title}]`.
#[derive(Default)]
pub struct Catalog {
    items: Mutex<Vec<String>>,
}

impl Catalog {
    pub fn titles(&self) -> Vec<String> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl Concept for Catalog {
    fn name(&self) -> &str {
        "Catalog"
    }

    fn actions(&self) -> &[&str] {
        &["addItem"]
    }

    fn queries(&self) -> &[&str] {
        &["_list"]
    }

    async fn perform(&self, _action: &str, args: Record) -> Result<Record> {
        let title = args.get_str("title").unwrap_or_default();
        if title.is_empty() {
            return Ok(Record::error("an item needs a title"));
        }
        let mut items = self.items.lock().unwrap();
        items.push(title.to_string());
        Ok(record! { "item" => format!("item-{}", items.len()) })
    }

    async fn query(&self, _query: &str, _args: Record) -> Result<Vec<Record>> {
        let items = self.items.lock().unwrap();
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, title)| record! { "item" => format!("item-{}", i + 1), "title" => title.as_str() })
            .collect())
    }
}

pub fn add_item() -> ActionSignature {
    ActionSignature::new("Catalog", "addItem")
}

/// `/Catalog/add` requests add an item and respond with it or the error.
fn rules() -> RuleRegistry {
    let [request, title, item, error] = vars(["request", "title", "item", "error"]);
    let on_request = Pattern::new().equals("path", "/Catalog/add");

    let add = Rule::builder("AddRequest")
        .variables([&request, &title])
        .when(
            Requesting::signature("request"),
            on_request.clone().bind("title", &title),
            Pattern::new().bind("request", &request),
        )
        .then(add_item(), Template::new().var("title", &title))
        .build()
        .unwrap();
    let added = Rule::builder("AddResponse")
        .variables([&request, &item])
        .when(
            Requesting::signature("request"),
            on_request.clone(),
            Pattern::new().bind("request", &request),
        )
        .when(add_item(), Pattern::new(), Pattern::new().bind("item", &item))
        .then(
            Requesting::signature("respond"),
            Template::new().var("request", &request).var("item", &item),
        )
        .build()
        .unwrap();
    let failed = Rule::builder("AddError")
        .variables([&request, &error])
        .when(
            Requesting::signature("request"),
            on_request,
            Pattern::new().bind("request", &request),
        )
        .when(add_item(), Pattern::new(), Pattern::new().bind("error", &error))
        .then(
            Requesting::signature("respond"),
            Template::new()
                .var("request", &request)
                .var("error", &error)
                .literal("status", 400),
        )
        .build()
        .unwrap();

    let mut rules = RuleRegistry::new();
    rules.register_all([add, added, failed]).unwrap();
    rules
}

pub struct Fixture {
    pub engine: Engine,
    pub requesting: Arc<Requesting>,
    pub catalog: Arc<Catalog>,
}

pub fn fixture() -> Fixture {
    let requesting = Arc::new(Requesting::new());
    let catalog = Arc::new(Catalog::default());
    let mut concepts = ConceptRegistry::new();
    concepts.register_shared(requesting.clone()).unwrap();
    concepts.register_shared(catalog.clone()).unwrap();
    Fixture {
        engine: Engine::new(concepts, rules()).unwrap(),
        requesting,
        catalog,
    }
}

impl Fixture {
    pub fn gateway(&self, config: GatewayConfig) -> Result<Gateway> {
        Gateway::new(self.engine.clone(), Arc::clone(&self.requesting), config)
    }

    /// A gateway that gives up quickly.
    pub fn impatient(&self, config: GatewayConfig) -> Gateway {
        self.gateway(config.with_timeout(Duration::from_millis(50)))
            .unwrap()
    }
}
