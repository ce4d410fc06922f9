use std::collections::{HashMap, HashSet};

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

use crate::application::render::types::AttributePolicy;

/// Tags that survive sanitisation. Everything else is escaped into text.
pub const ALLOWED_TAGS: [&str; 18] = [
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "code",
    "pre",
    "ol",
    "li",
    "ul",
    "blockquote",
    "a",
    "img",
    "div",
    "strong",
    "em",
];

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

pub(crate) fn allowed_tags() -> HashSet<&'static str> {
    HashSet::from(ALLOWED_TAGS)
}

pub(crate) fn build_sanitizer(policy: AttributePolicy) -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    builder.tags(allowed_tags());
    builder.generic_attributes(HashSet::<&str>::new());
    builder.tag_attributes(HashMap::<&str, HashSet<&str>>::new());
    builder.link_rel(None);
    builder.strip_comments(true);

    if policy == AttributePolicy::LinksAndImages {
        builder.add_tag_attributes("a", &["href"]);
        builder.add_tag_attributes("img", &["src", "alt"]);
        builder.url_schemes(HashSet::from(["http", "https", "mailto"]));
        builder.link_rel(Some("noopener noreferrer"));
    }

    builder
}

fn configure_extensions(options: &mut Options<'static>) {
    // Plain CommonMark: fenced code and unambiguous lists are part of the core grammar.
    let ext = &mut options.extension;
    ext.tagfilter = false;
    ext.strikethrough = false;
    ext.table = false;
    ext.autolink = false;

    let render = &mut options.render;
    render.github_pre_lang = false;
    render.full_info_string = false;
    // Raw HTML must reach the sanitizer so it can be escaped instead of dropped.
    render.r#unsafe = true;
    render.sourcepos = false;
}
