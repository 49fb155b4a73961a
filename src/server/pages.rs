//! Server-rendered HTML pages.
//!
//! Every page shares one layout: header with the software name, flash
//! messages, the page body and a footer with the contact address.

use crate::config::SiteConfig;
use crate::storage::ExpiryOption;
use axum::http::StatusCode;
use std::fmt::Write as _;

/// Escapes text for use in HTML element content and double-quoted attributes.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(site: &SiteConfig, title: &str, flashes: &[String], body: &str) -> String {
    let mut flash_html = String::new();
    if !flashes.is_empty() {
        flash_html.push_str("<ul class=\"flashes\">");
        for message in flashes {
            let _ = write!(flash_html, "<li>{}</li>", escape(message));
        }
        flash_html.push_str("</ul>");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · {name}</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<header><a class="brand" href="/">{name}</a><nav><a href="/upload">{upload_title}</a></nav></header>
<main>
<h1>{title}</h1>
{flash_html}
{body}
</main>
<footer>Contact : <a href="mailto:{contact}">{contact}</a></footer>
</body>
</html>
"#,
        title = escape(title),
        name = escape(&site.software_name),
        upload_title = escape(&site.title_upload_file),
        contact = escape(&site.contact_email),
    )
}

pub fn index(site: &SiteConfig, flashes: &[String]) -> String {
    let body = format!(
        r#"<p>Partagez un fichier avec un lien temporaire. Le lien expire automatiquement.</p>
<p><a class="button" href="/upload">{}</a></p>"#,
        escape(&site.title_upload_file)
    );
    layout(site, &site.software_name, flashes, &body)
}

pub fn upload_form(
    site: &SiteConfig,
    flashes: &[String],
    csrf_token: &str,
    allowed_extensions: &[String],
) -> String {
    let mut options = String::new();
    for opt in ExpiryOption::ALL {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            opt.as_str(),
            opt.label()
        );
    }
    let accept = allowed_extensions
        .iter()
        .map(|ext| format!(".{}", escape(ext)))
        .collect::<Vec<_>>()
        .join(",");

    let body = format!(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">
<input type="hidden" name="csrf_token" value="{csrf}">
<label>Choisissez un fichier <input type="file" name="file" accept="{accept}" required></label>
<label>Mot de passe (optionnel) <input type="password" name="password"></label>
<label>Durée de validité <select name="expiry" required>{options}</select></label>
<label>Nombre maximal de téléchargements <input type="number" name="max_downloads" min="1"></label>
<button type="submit">Téléverser</button>
</form>"#,
        csrf = escape(csrf_token),
    );
    layout(site, &site.title_upload_file, flashes, &body)
}

pub fn password_form(
    site: &SiteConfig,
    flashes: &[String],
    csrf_token: &str,
    file_id: &str,
    filename: &str,
) -> String {
    let body = format!(
        r#"<p>Le fichier <strong>{filename}</strong> est protégé par un mot de passe.</p>
<form method="post" action="/download/{id}">
<input type="hidden" name="csrf_token" value="{csrf}">
<label>Mot de passe <input type="password" name="password" required autofocus></label>
<button type="submit">Télécharger</button>
</form>"#,
        filename = escape(filename),
        id = escape(file_id),
        csrf = escape(csrf_token),
    );
    layout(site, &site.title_download_file, flashes, &body)
}

pub fn file_not_found(site: &SiteConfig, flashes: &[String]) -> String {
    layout(
        site,
        "Fichier introuvable",
        flashes,
        "<p>Ce lien ne correspond à aucun fichier.</p>",
    )
}

pub fn file_expired(site: &SiteConfig, flashes: &[String]) -> String {
    layout(
        site,
        "Fichier expiré",
        flashes,
        "<p>Ce fichier n'est plus disponible.</p>",
    )
}

pub fn not_found(site: &SiteConfig) -> String {
    layout(site, "Page introuvable", &[], "<p>Cette page n'existe pas.</p>")
}

pub fn error_page(site: &SiteConfig, status: StatusCode, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    layout(site, title, &[], &format!("<p>{}</p>", escape(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn flashes_and_branding_are_rendered_escaped() {
        let site = SiteConfig {
            software_name: "Drop<Box>".to_string(),
            ..SiteConfig::default()
        };
        let html = index(&site, &["<script>".to_string()]);
        assert!(html.contains("Drop&lt;Box&gt;"));
        assert!(html.contains("<li>&lt;script&gt;</li>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn upload_form_offers_every_expiry() {
        let html = upload_form(&SiteConfig::default(), &[], "tok", &["txt".to_string()]);
        for opt in ExpiryOption::ALL {
            assert!(html.contains(&format!(r#"value="{}""#, opt.as_str())));
        }
        assert!(html.contains(r#"name="csrf_token" value="tok""#));
        assert!(html.contains(r#"accept=".txt""#));
    }
}
