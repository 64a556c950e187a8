//! Built-in vocabulary: ActivityStreams actors and statuses plus the
//! book catalog objects exchanged between reading-site peers.

use serde_json::json;

use crate::entity_type::{EntityFamily, EntityField, EntityType};
use crate::schema::{FieldSpec, ObjectSchema};

pub const OBJECT: &str = "Object";
pub const PERSON: &str = "Person";
pub const PUBLIC_KEY: &str = "PublicKey";
pub const BOOK: &str = "Book";
pub const EDITION: &str = "Edition";
pub const WORK: &str = "Work";
pub const NOTE: &str = "Note";
pub const COMMENT: &str = "Comment";
pub const QUOTATION: &str = "Quotation";
pub const REVIEW: &str = "Review";

/// Persisted entity type and family names.
pub mod entities {
    pub const USER: &str = "user";
    pub const KEY_PAIR: &str = "key_pair";
    pub const BOOK: &str = "book";
    pub const EDITION: &str = "edition";
    pub const WORK: &str = "work";
    pub const STATUS: &str = "status";
    pub const COMMENT: &str = "comment";
    pub const QUOTATION: &str = "quotation";
    pub const REVIEW: &str = "review";
}

/// Wire schemas in registration order (parents before children).
pub fn object_schemas() -> Vec<ObjectSchema> {
    vec![
        ObjectSchema::new(PUBLIC_KEY)
            .fixed_type()
            .field(FieldSpec::text("owner"))
            .field(FieldSpec::text("publicKeyPem")),
        ObjectSchema::new(PERSON)
            .fixed_type()
            .field(FieldSpec::text("preferredUsername"))
            .field(FieldSpec::text("name").optional())
            .field(FieldSpec::text("summary").optional())
            .field(FieldSpec::text("inbox"))
            .field(FieldSpec::text("outbox"))
            .field(FieldSpec::text("followers"))
            .field(FieldSpec::text("following").optional())
            .field(FieldSpec::reference("publicKey", Some(PUBLIC_KEY)))
            .field(FieldSpec::json("endpoints").optional())
            .field(FieldSpec::attachment("icon").optional())
            .field(FieldSpec::boolean("bookwyrmUser").or_default(true))
            .field(FieldSpec::boolean("manuallyApprovesFollowers").or_default(false))
            .field(FieldSpec::boolean("discoverable").or_default(true)),
        ObjectSchema::new(BOOK)
            .field(FieldSpec::text("title"))
            .field(FieldSpec::text("sortTitle").optional())
            .field(FieldSpec::text("subtitle").optional())
            .field(FieldSpec::text("description").optional())
            .field(FieldSpec::text_list("languages").or_default(json!([])))
            .field(FieldSpec::text("series").optional())
            .field(FieldSpec::text("seriesNumber").optional())
            .field(FieldSpec::text_list("subjects").or_default(json!([])))
            .field(FieldSpec::text_list("subjectPlaces").or_default(json!([])))
            .field(FieldSpec::text_list("authors").or_default(json!([])))
            .field(FieldSpec::datetime("firstPublishedDate").optional())
            .field(FieldSpec::datetime("publishedDate").optional())
            .field(FieldSpec::text("openlibraryKey").optional())
            .field(FieldSpec::text("librarythingKey").optional())
            .field(FieldSpec::text("goodreadsKey").optional())
            .field(FieldSpec::attachment("cover").optional()),
        ObjectSchema::extending(EDITION, BOOK)
            .fixed_type()
            .field(FieldSpec::reference("work", Some(WORK)))
            .field(FieldSpec::text("isbn10").optional())
            .field(FieldSpec::text("isbn13").optional())
            .field(FieldSpec::text("oclcNumber").optional())
            .field(FieldSpec::text("asin").optional())
            .field(FieldSpec::integer("pages").optional())
            .field(FieldSpec::text("physicalFormat").optional())
            .field(FieldSpec::text_list("publishers").or_default(json!([]))),
        ObjectSchema::extending(WORK, BOOK)
            .fixed_type()
            .field(FieldSpec::text("lccn").optional())
            .field(FieldSpec::text_list("editions").or_default(json!([]))),
        ObjectSchema::new(NOTE)
            .fixed_type()
            .field(FieldSpec::reference("attributedTo", Some(PERSON)))
            .field(FieldSpec::text("content"))
            .field(FieldSpec::datetime("published"))
            .field(FieldSpec::text_list("to").or_default(json!([])))
            .field(FieldSpec::text_list("cc").or_default(json!([])))
            .field(FieldSpec::text("inReplyTo").optional())
            .field(FieldSpec::text("summary").optional())
            .field(FieldSpec::boolean("sensitive").or_default(false))
            .field(FieldSpec::json("tag").or_default(json!([])))
            .field(FieldSpec::json("attachment").or_default(json!([]))),
        ObjectSchema::extending(COMMENT, NOTE)
            .fixed_type()
            .field(FieldSpec::reference("inReplyToBook", Some(EDITION))),
        ObjectSchema::extending(QUOTATION, COMMENT)
            .fixed_type()
            .field(FieldSpec::text("quote")),
        ObjectSchema::extending(REVIEW, COMMENT)
            .fixed_type()
            .field(FieldSpec::text("name").optional())
            .field(FieldSpec::integer("rating").optional()),
    ]
}

fn book_fields() -> Vec<EntityField> {
    vec![
        EntityField::scalar("title", "title"),
        EntityField::scalar("sort_title", "sortTitle"),
        EntityField::scalar("subtitle", "subtitle"),
        EntityField::scalar("description", "description"),
        EntityField::scalar("languages", "languages"),
        EntityField::scalar("series", "series"),
        EntityField::scalar("series_number", "seriesNumber"),
        EntityField::scalar("subjects", "subjects"),
        EntityField::scalar("subject_places", "subjectPlaces"),
        EntityField::scalar("first_published_date", "firstPublishedDate"),
        EntityField::scalar("published_date", "publishedDate"),
        EntityField::scalar("openlibrary_key", "openlibraryKey"),
        EntityField::scalar("librarything_key", "librarythingKey"),
        EntityField::scalar("goodreads_key", "goodreadsKey"),
        EntityField::attachment("cover", "cover"),
    ]
}

fn status_fields() -> Vec<EntityField> {
    vec![
        EntityField::foreign_key("user", "attributedTo", entities::USER),
        EntityField::scalar("content", "content"),
        EntityField::scalar("published_date", "published"),
        EntityField::scalar("content_warning", "summary"),
        EntityField::scalar("sensitive", "sensitive"),
        EntityField::scalar("reply_parent", "inReplyTo"),
    ]
}

fn commentary_fields() -> Vec<EntityField> {
    let mut fields = status_fields();
    fields.push(EntityField::foreign_key("book", "inReplyToBook", entities::BOOK));
    fields
}

/// Persisted entity types.
pub fn entity_types() -> Vec<EntityType> {
    vec![
        EntityType::new(entities::USER)
            .accepts(PERSON)
            .hosted_at("user")
            .with_fields([
                EntityField::scalar("username", "preferredUsername"),
                EntityField::scalar("name", "name"),
                EntityField::scalar("summary", "summary"),
                EntityField::scalar("inbox", "inbox"),
                EntityField::scalar("outbox", "outbox"),
                EntityField::scalar("followers_url", "followers"),
                EntityField::scalar("bookwyrm_user", "bookwyrmUser"),
                EntityField::scalar("manually_approves_followers", "manuallyApprovesFollowers"),
                EntityField::scalar("discoverable", "discoverable"),
                EntityField::one_to_one("key_pair", "publicKey", entities::KEY_PAIR),
                EntityField::attachment("avatar", "icon"),
            ]),
        EntityType::new(entities::KEY_PAIR)
            .accepts(PUBLIC_KEY)
            .hosted_at("key")
            .with_field(EntityField::scalar("public_key", "publicKeyPem")),
        EntityType::new(entities::BOOK)
            .hosted_at("book")
            .tracking_origin()
            .with_fields(book_fields()),
        EntityType::new(entities::EDITION)
            .accepts(EDITION)
            .hosted_at("book")
            .tracking_origin()
            .with_fields(book_fields())
            .with_fields([
                EntityField::foreign_key("parent_work", "work", entities::WORK),
                EntityField::scalar("isbn_10", "isbn10"),
                EntityField::scalar("isbn_13", "isbn13"),
                EntityField::scalar("oclc_number", "oclcNumber"),
                EntityField::scalar("asin", "asin"),
                EntityField::scalar("pages", "pages"),
                EntityField::scalar("physical_format", "physicalFormat"),
                EntityField::scalar("publishers", "publishers"),
            ]),
        EntityType::new(entities::WORK)
            .accepts(WORK)
            .hosted_at("book")
            .tracking_origin()
            .with_fields(book_fields())
            .with_field(EntityField::scalar("lccn", "lccn")),
        EntityType::new(entities::STATUS)
            .accepts(NOTE)
            .hosted_at("status")
            .with_fields(status_fields()),
        EntityType::new(entities::COMMENT)
            .accepts(COMMENT)
            .hosted_at("status")
            .with_fields(commentary_fields()),
        EntityType::new(entities::QUOTATION)
            .accepts(QUOTATION)
            .hosted_at("status")
            .with_fields(commentary_fields())
            .with_field(EntityField::scalar("quote", "quote")),
        EntityType::new(entities::REVIEW)
            .accepts(REVIEW)
            .hosted_at("status")
            .with_fields(commentary_fields())
            .with_fields([
                EntityField::scalar("name", "name"),
                EntityField::scalar("rating", "rating"),
            ]),
    ]
}

/// Polymorphic families. Types not listed here form single-member families.
pub fn families() -> Vec<EntityFamily> {
    vec![
        EntityFamily::new(
            entities::BOOK,
            entities::BOOK,
            &[entities::EDITION, entities::WORK],
        ),
        EntityFamily::new(
            entities::STATUS,
            entities::STATUS,
            &[entities::COMMENT, entities::QUOTATION, entities::REVIEW],
        ),
    ]
}
