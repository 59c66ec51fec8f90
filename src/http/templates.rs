//! Server-rendered HTML fragments via `minijinja`. Templates are embedded
//! with `include_str!` rather than loaded from disk, so the daemon
//! binary is self-contained.

use minijinja::Environment;
use once_cell::sync::Lazy;

pub static TEMPLATES: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_template("base.html", include_str!("../../templates/base.html"))
        .expect("base.html must parse");
    env.add_template("index.html", include_str!("../../templates/index.html"))
        .expect("index.html must parse");
    env.add_template(
        "partials/board.html",
        include_str!("../../templates/partials/board.html"),
    )
    .expect("partials/board.html must parse");
    env.add_template(
        "partials/stats.html",
        include_str!("../../templates/partials/stats.html"),
    )
    .expect("partials/stats.html must parse");
    env.add_template(
        "partials/agents.html",
        include_str!("../../templates/partials/agents.html"),
    )
    .expect("partials/agents.html must parse");
    env.add_template(
        "partials/messages.html",
        include_str!("../../templates/partials/messages.html"),
    )
    .expect("partials/messages.html must parse");
    env.add_template(
        "partials/fleet.html",
        include_str!("../../templates/partials/fleet.html"),
    )
    .expect("partials/fleet.html must parse");
    env.add_template(
        "partials/config.html",
        include_str!("../../templates/partials/config.html"),
    )
    .expect("partials/config.html must parse");
    env
});
