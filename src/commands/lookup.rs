use super::open_existing_store;
use crate::OutputFormat;
use anyhow::Result;
use olindex::{config::Config, util::truncate_str, Author, Edition, LookupError, Reference, Work};
use serde::Serialize;

const DESCRIPTION_WIDTH: usize = 300;

pub async fn isbn(config: Config, isbn: String, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let found = not_found_as_none(store.lookup_by_isbn(&isbn))?;
    emit(format, found.as_ref(), print_edition, || {
        println!("No edition found for ISBN {}", isbn.trim())
    })
}

pub async fn title(config: Config, title: String, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let results = store.search_by_title(&title)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No works found matching \"{}\"", title.trim());
        return Ok(());
    }

    println!("Found {} works:\n", results.len());
    for (i, edition) in results.iter().enumerate() {
        println!("{}. {} ({})", i + 1, edition.title, edition.key);
        if !edition.authors.is_empty() {
            println!("   Authors: {}", join_keys(&edition.authors));
        }
    }
    Ok(())
}

pub async fn author(config: Config, query: String, by_name: bool, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let result = if by_name {
        store.lookup_author_by_name(&query)
    } else {
        store.lookup_author(&query)
    };
    let found = not_found_as_none(result)?;
    emit(format, found.as_ref(), print_author, || {
        println!("No author found for {}", query.trim())
    })
}

pub async fn work(config: Config, key: String, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let found = not_found_as_none(store.lookup_work(&key))?;
    emit(format, found.as_ref(), print_work, || println!("No work found for {}", key))
}

pub async fn edition(config: Config, key: String, format: OutputFormat) -> Result<()> {
    let store = open_existing_store(&config)?;
    let found = not_found_as_none(store.lookup_edition(&key))?;
    emit(format, found.as_ref(), print_edition, || {
        println!("No edition found for {}", key)
    })
}

/// Not-found is a normal answer for the CLI; anything else is an error
fn not_found_as_none<T>(result: Result<T, LookupError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn emit<T: Serialize>(
    format: OutputFormat,
    value: Option<&T>,
    print_text: fn(&T),
    print_missing: impl FnOnce(),
) -> Result<()> {
    match (format, value) {
        (OutputFormat::Json, value) => println!("{}", serde_json::to_string_pretty(&value)?),
        (OutputFormat::Text, Some(value)) => print_text(value),
        (OutputFormat::Text, None) => print_missing(),
    }
    Ok(())
}

fn join_keys(refs: &[Reference]) -> String {
    refs.iter()
        .map(|r| r.key.as_str())
        .filter(|k| !k.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_description(text: &str) {
    if !text.is_empty() {
        println!("\n{}", truncate_str(text, DESCRIPTION_WIDTH));
    }
}

fn print_edition(edition: &Edition) {
    println!("{}", edition.title);
    println!("  Key:        {}", edition.key);
    if !edition.isbn_13.is_empty() {
        println!("  ISBN-13:    {}", edition.isbn_13.join(", "));
    }
    if !edition.isbn_10.is_empty() {
        println!("  ISBN-10:    {}", edition.isbn_10.join(", "));
    }
    if !edition.authors.is_empty() {
        println!("  Authors:    {}", join_keys(&edition.authors));
    }
    if !edition.publishers.is_empty() {
        println!("  Publishers: {}", edition.publishers.join(", "));
    }
    if !edition.publish_date.is_empty() {
        println!("  Published:  {}", edition.publish_date);
    }
    if !edition.works.is_empty() {
        println!("  Works:      {}", join_keys(&edition.works));
    }
    if let Some(cover) = edition.covers.first() {
        println!("  Cover:      {}", cover);
    }
    print_description(edition.description_text());
}

fn print_work(work: &Work) {
    println!("{}", work.title);
    println!("  Key:      {}", work.key);
    if !work.authors.is_empty() {
        println!("  Authors:  {}", join_keys(&work.authors));
    }
    if !work.subjects.is_empty() {
        println!("  Subjects: {}", truncate_str(&work.subjects.join(", "), 120));
    }
    print_description(work.description_text());
}

fn print_author(author: &Author) {
    println!("{}", author.name);
    println!("  Key:  {}", author.key);
    if !author.birth_date.is_empty() || !author.death_date.is_empty() {
        println!("  Life: {} - {}", author.birth_date, author.death_date);
    }
    print_description(author.bio_text());
}
