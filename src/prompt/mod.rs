//! Persona system-prompt assembly.
//!
//! Auxiliary context (site config, file listing) is gathered best-effort:
//! read failures fall back to placeholders and are never propagated.

use tracing::debug;

use crate::project::ProjectStore;
use crate::tools::dispatch::{flatten_tree, SITE_CONFIG_FILE};
use crate::types::{Persona, ProjectContext};

/// Frontmatter conventions for the known content-collection types.
const COLLECTIONS_GUIDE: &str = "\
Content collections and their frontmatter conventions:
- posts: title (string), date (YYYY-MM-DD string), tags (string array), draft (bool)
- pages: title (string), description (string), order (number)
- docs: title (string), category (string), sidebar_position (number)
Every content file starts with a `---`-delimited frontmatter block.";

/// Build the instruction string handed to the provider as the system role.
pub async fn build_system_prompt(context: &ProjectContext, store: &dyn ProjectStore) -> String {
    match context.persona {
        Persona::Content => content_prompt(context),
        Persona::Site => site_prompt(context, store).await,
    }
}

/// The "content" persona is scoped to the single open file: no project tree,
/// no site-wide context.
fn content_prompt(context: &ProjectContext) -> String {
    let mut prompt = format!(
        "You are a writing assistant for \"{}\". You help the user edit the \
         content file they currently have open. Keep the file's frontmatter \
         block intact unless asked to change it, and use your tools for every \
         file modification.",
        context.site_name
    );

    match &context.open_file {
        Some(open) => {
            prompt.push_str(&format!(
                "\n\nCurrently open file: {}\n\n```\n{}\n```",
                open.path, open.content
            ));
        }
        None => prompt.push_str("\n\nNo file is currently open."),
    }

    prompt
}

/// The "site" persona sees the whole project: configuration, file listing,
/// and the collection conventions.
async fn site_prompt(context: &ProjectContext, store: &dyn ProjectStore) -> String {
    let config = match store.read_text(&context.root.join(SITE_CONFIG_FILE)).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "site config unavailable for prompt");
            "{}".to_string()
        }
    };

    let listing = match store.list_tree(&context.root).await {
        Ok(tree) => flatten_tree(&tree),
        Err(e) => {
            debug!(error = %e, "file listing unavailable for prompt");
            String::new()
        }
    };

    let description = context
        .site_description
        .as_deref()
        .unwrap_or("(no description)");

    format!(
        "You are the site assistant for \"{}\" — {}. You manage the site's \
         structure, configuration, and pages through your tools. Prefer small, \
         targeted edits over rewriting whole files.\n\n\
         Site configuration ({SITE_CONFIG_FILE}):\n{config}\n\n\
         Project files:\n{listing}\n\n\
         {COLLECTIONS_GUIDE}",
        context.site_name, description
    )
}
