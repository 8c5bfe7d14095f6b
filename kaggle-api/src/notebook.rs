//! Notebook document construction and slug derivation.

use serde_json::{Value, json};

/// Derive the upstream kernel slug from a human-readable title.
///
/// Rules: lowercase; ASCII alphanumerics are kept; runs of whitespace or
/// underscores become a single hyphen; every other character is dropped;
/// consecutive hyphens collapse and the result carries no leading or
/// trailing hyphen. `"My Notebook"` derives `"my-notebook"`.
pub fn notebook_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_owned()
}

/// Build the fixed notebook document pushed to the kernel endpoint: a
/// single code cell under Python 3 kernel metadata, nbformat 4.
pub fn single_cell_notebook(code: &str) -> Value {
    json!({
        "cells": [
            {
                "cell_type": "code",
                "execution_count": null,
                "metadata": {},
                "outputs": [],
                "source": code,
            }
        ],
        "metadata": {
            "kernelspec": {
                "display_name": "Python 3",
                "language": "python",
                "name": "python3",
            },
            "language_info": {
                "name": "python",
                "version": "3.10",
            },
        },
        "nbformat": 4,
        "nbformat_minor": 4,
    })
}
