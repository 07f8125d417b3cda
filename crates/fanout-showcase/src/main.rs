#![forbid(unsafe_code)]

//! Showcase binary entry point.

use fanout::{Dispatcher, Emitter};
use fanout_showcase::cart::{CartAction, CartStore};
use fanout_showcase::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = cli::Opts::parse();

    // Scene 1: keyed events. Two consumers subscribe to session events;
    // the producer only knows the emitter.
    let sessions: Emitter<String> = Emitter::new();
    let _greeter = sessions.register("login", |name: &String| {
        println!("hello {name}");
    });
    let _fareweller = sessions.register("logout", |name: &String| {
        println!("goodbye {name}");
    });

    if let Err(err) = sessions
        .dispatch("login", &opts.user)
        .and_then(|()| sessions.dispatch("logout", &opts.user))
    {
        eprintln!("session dispatch failed: {err}");
        std::process::exit(1);
    }

    // Scene 2: the store pattern. The cart subscribes to every action
    // and filters by matching; producers dispatch tagged values.
    let actions: Dispatcher<CartAction> = Dispatcher::new();
    let store = CartStore::attach(&actions);

    for product_id in &opts.products {
        if let Err(err) = actions.dispatch(&CartAction::AddItem {
            product_id: product_id.clone(),
        }) {
            eprintln!("cart dispatch failed: {err}");
            std::process::exit(1);
        }
    }

    println!("cart:");
    for item in store.items() {
        println!("  {} x{}", item.product_id, item.quantity);
    }
}
