//! Example wiring a small application through a context
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example wiring --features logging-pretty
//! ```
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example wiring --features logging-json
//! ```

use ioc_context::{BeanError, ComponentDescriptor, Context, Descriptors, FactoryDescriptor};
use std::sync::Arc;

trait Notifier: Send + Sync {
    fn notify(&self, user: &str) -> String;
}

struct Settings {
    database_url: &'static str,
    sender: &'static str,
}

struct Database {
    url: &'static str,
}

struct EmailNotifier {
    sender: &'static str,
}

impl Notifier for EmailNotifier {
    fn notify(&self, user: &str) -> String {
        format!("mail from {} to {}", self.sender, user)
    }
}

struct UserService {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
}

impl UserService {
    fn register(&self, user: &str) -> String {
        format!("stored {} in {}; {}", user, self.db.url, self.notifier.notify(user))
    }
}

fn descriptors() -> Descriptors {
    Descriptors::new()
        .component(ComponentDescriptor::of::<Settings>().constructor(|_: ()| Settings {
            database_url: "postgres://localhost/app",
            sender: "noreply@example.com",
        }))
        .component(
            ComponentDescriptor::of::<EmailNotifier>()
                .constructor(|settings: Arc<Settings>| EmailNotifier {
                    sender: settings.sender,
                })
                .provides::<dyn Notifier, _>(|this| this as Arc<dyn Notifier>),
        )
        .component(ComponentDescriptor::of::<UserService>().constructor(
            |(db, notifier): (Arc<Database>, Arc<dyn Notifier>)| UserService { db, notifier },
        ))
        // The bean is named after the operation, not the type
        .factory(
            FactoryDescriptor::new::<Settings, Database>("database")
                .method(|settings: Arc<Settings>, _: ()| Database {
                    url: settings.database_url,
                }),
        )
}

fn main() -> Result<(), BeanError> {
    ioc_context::logging::init();

    println!("=== ioc-context Wiring Demo ===\n");

    let context = Context::new(descriptors());
    context.init()?;
    context.verify()?;

    println!("Beans: {:?}", context.bean_names());

    // First access builds userService and everything it needs
    let users = context.get::<UserService>("userService")?;
    println!("{}", users.register("ada"));

    // Later accesses return the same instances
    let db = context.get::<Database>("database")?;
    println!("Shared database: {}", Arc::ptr_eq(&users.db, &db));

    let notifier = context.get::<dyn Notifier>("emailNotifier")?;
    println!("{}", notifier.notify("grace"));

    match context.get::<UserService>("database") {
        Err(err) => println!("Expected failure: {err}"),
        Ok(_) => println!("Unexpected success"),
    }

    println!("\n{context:?}");
    Ok(())
}
