//! Páginas HTML devolvidas ao navegador.

use sho_storage::Outcome;

fn header(description: &str) -> String {
    format!(
        r#"<html lang="en">
    <head>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1">

        <title>sho.com</title>
        <meta name="description" content="{description}">
    </head>"#
    )
}

/// Escapa texto vindo do usuário antes de ir para o HTML.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn name_collision_page(key: &str) -> String {
    format!(
        "{}
    <body>
        <h2>Sorry, the short URL name {} is already taken.</h2>
    </body>
</html>",
        header("Name unavailable"),
        escape(key)
    )
}

pub fn new_mapping_page(key: &str, destination: &str) -> String {
    format!(
        "{}
    <body>
        <h2>{} now points to {}</h2>
    </body>
</html>",
        header("Short URL created"),
        escape(key),
        escape(destination)
    )
}

pub fn incorrect_submission_page() -> String {
    format!(
        "{}
    <body>
        <h2>URL field must be non-empty</h2>
    </body>
</html>",
        header("Incorrect submission")
    )
}

/// Página do resultado de uma criação.
pub fn outcome_page(outcome: &Outcome) -> String {
    match outcome {
        Outcome::InvalidInput => incorrect_submission_page(),
        Outcome::NameCollision(key) => name_collision_page(key),
        Outcome::Created { key, destination } => new_mapping_page(key, destination),
    }
}

/// Página inicial usada quando nenhum `--landing` é informado.
pub fn default_landing_page() -> String {
    format!(
        r#"{}
    <body>
        <h1>sho.com</h1>
        <form method="post" action="/" enctype="multipart/form-data">
            <p><label>URL <input type="text" name="URL" required></label></p>
            <p><label>Custom name <input type="text" name="SEO"></label></p>
            <p><label>Time to live (seconds, 0 = forever) <input type="number" name="TTL" min="0" value="0"></label></p>
            <p><input type="submit" value="Shorten"></p>
        </form>
    </body>
</html>"#,
        header("URL redirector")
    )
}
