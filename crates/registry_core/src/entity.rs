use std::fmt;
use std::str::FromStr;

use crate::record::AliasTable;

/// Resources served by the backend services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Asset,
    Employee,
    Department,
    Location,
    Invoice,
    Owner,
    OwnerType,
    Supplier,
    Maintainer,
    TemporaryUser,
    User,
    Category,
}

impl EntityKind {
    pub const ALL: [EntityKind; 12] = [
        EntityKind::Asset,
        EntityKind::Employee,
        EntityKind::Department,
        EntityKind::Location,
        EntityKind::Invoice,
        EntityKind::Owner,
        EntityKind::OwnerType,
        EntityKind::Supplier,
        EntityKind::Maintainer,
        EntityKind::TemporaryUser,
        EntityKind::User,
        EntityKind::Category,
    ];

    /// Path segment under `/api/`.
    pub fn resource(self) -> &'static str {
        match self {
            EntityKind::Asset => "Asset",
            EntityKind::Employee => "Employee",
            EntityKind::Department => "Department",
            EntityKind::Location => "location",
            EntityKind::Invoice => "Invoice",
            EntityKind::Owner => "Owner",
            EntityKind::OwnerType => "OwnerType",
            EntityKind::Supplier => "Supplier",
            EntityKind::Maintainer => "Maintainer",
            EntityKind::TemporaryUser => "TemporaryUser",
            EntityKind::User => "User",
            EntityKind::Category => "Category",
        }
    }

    /// Other path spellings some deployments serve the list under.
    pub fn alternate_resources(self) -> &'static [&'static str] {
        match self {
            EntityKind::Location => &["Location", "locations"],
            _ => &[],
        }
    }

    /// camelCase stem used for `<entity>Id` / `<entity>Name` style aliases.
    pub fn stem(self) -> &'static str {
        match self {
            EntityKind::Asset => "asset",
            EntityKind::Employee => "employee",
            EntityKind::Department => "department",
            EntityKind::Location => "location",
            EntityKind::Invoice => "invoice",
            EntityKind::Owner => "owner",
            EntityKind::OwnerType => "ownerType",
            EntityKind::Supplier => "supplier",
            EntityKind::Maintainer => "maintainer",
            EntityKind::TemporaryUser => "temporaryUser",
            EntityKind::User => "user",
            EntityKind::Category => "category",
        }
    }

    /// Plural label for footers and empty-state messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Asset => "assets",
            EntityKind::Employee => "employees",
            EntityKind::Department => "departments",
            EntityKind::Location => "locations",
            EntityKind::Invoice => "invoices",
            EntityKind::Owner => "owners",
            EntityKind::OwnerType => "owner types",
            EntityKind::Supplier => "suppliers",
            EntityKind::Maintainer => "maintainers",
            EntityKind::TemporaryUser => "temporary users",
            EntityKind::User => "users",
            EntityKind::Category => "categories",
        }
    }

    /// Resource-specific wrapper keys checked after `items`, `data` and `result`.
    pub fn list_keys(self) -> Vec<String> {
        let stem = self.stem();
        let plural = match self {
            EntityKind::Category => "categories".to_string(),
            _ => format!("{stem}s"),
        };
        vec![plural, format!("{stem}List")]
    }

    /// Identifier aliases in resolution order.
    pub fn id_aliases(self) -> Vec<String> {
        let stem = self.stem();
        vec![
            "id".to_string(),
            "ID".to_string(),
            format!("{stem}Id"),
            format!("{}Id", pascal(stem)),
        ]
    }

    pub fn alias_table(self) -> AliasTable {
        let stem = self.stem();
        let pascal_stem = pascal(stem);
        let mut table = AliasTable::new(self.id_aliases()).field(
            "name",
            vec![
                "name".to_string(),
                "Name".to_string(),
                format!("{stem}Name"),
                format!("{pascal_stem}Name"),
            ],
        );

        for extra in self.extra_fields() {
            let aliases = match *extra {
                "description" => vec!["description", "Description", "desc"],
                "email" => vec!["email", "Email", "emailAddress"],
                "imageUrl" => vec!["imageUrl", "ImageUrl", "image", "photoUrl"],
                "phoneNumber" => vec!["phoneNumber", "PhoneNumber", "phone"],
                "createdAt" => vec!["createdAt", "CreatedAt", "createdDate", "dateCreated"],
                "amount" => vec!["amount", "Amount", "totalAmount", "TotalAmount"],
                _ => vec![*extra],
            };
            table = table.field(extra, aliases.into_iter().map(String::from).collect());
        }
        table
    }

    fn extra_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Asset => &["description", "imageUrl", "createdAt"],
            EntityKind::Employee => &["email", "phoneNumber", "imageUrl"],
            EntityKind::User => &["email", "imageUrl"],
            EntityKind::TemporaryUser | EntityKind::OwnerType | EntityKind::Category => {
                &["description"]
            }
            EntityKind::Invoice => &["amount", "createdAt"],
            EntityKind::Supplier | EntityKind::Maintainer | EntityKind::Owner => {
                &["email", "phoneNumber"]
            }
            EntityKind::Department | EntityKind::Location => &[],
        }
    }

    /// Fixed local-storage key for this entity's add-form draft.
    pub fn draft_key(self) -> String {
        let slug: String = self
            .label()
            .trim_end_matches('s')
            .replace("categorie", "category")
            .replace(' ', "-");
        format!("add-{slug}-draft-v1")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntity(pub String);

impl fmt::Display for UnknownEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource {:?}", self.0)
    }
}

impl std::error::Error for UnknownEntity {}

impl FromStr for EntityKind {
    type Err = UnknownEntity;

    /// Accepts the resource name, the camelCase stem, kebab-case and the plural label.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let wanted: String = input
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| {
                let stem = kind.stem().to_ascii_lowercase();
                let label: String = kind.label().chars().filter(|c| *c != ' ').collect();
                wanted == stem || wanted == label
            })
            .ok_or_else(|| UnknownEntity(input.to_string()))
    }
}

fn pascal(stem: &str) -> String {
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
