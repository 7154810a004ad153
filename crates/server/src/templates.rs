use anyhow::Context as _;
use tera::Tera;

const TEMPLATES: [(&str, &str); 4] = [
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("form.html", include_str!("../templates/form.html")),
    ("error.html", include_str!("../templates/error.html")),
];

/// Builds the page templates compiled into the binary. `.html` names are
/// autoescaped.
pub fn load_templates() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES)
        .context("failed to compile page templates")?;
    Ok(tera)
}
