use serde::ser::{self, Impossible, Serialize, Serializer};

/// Wire form of an emitted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A string payload, sent as-is.
    Text(String),
    /// JSON text of any other value.
    Json(String),
}

impl Payload {
    /// Sends strings verbatim and everything else as JSON text.
    ///
    /// Only values that serialize *as a string* (`str`, `String`, `Cow<str>`,
    /// `Box<str>`, a JSON string `Value`) take the verbatim path. Enum variants,
    /// `char` and newtype wrappers are encoded as JSON so they decode back.
    pub fn encode<P: Serialize + ?Sized>(payload: &P) -> Result<Self, serde_json::Error> {
        match payload.serialize(TextOnly) {
            Ok(Some(text)) => Ok(Payload::Text(text)),
            _ => serde_json::to_string(payload).map(Payload::Json),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Payload::Text(text) | Payload::Json(text) => text,
        }
    }

    pub fn into_wire(self) -> String {
        match self {
            Payload::Text(text) | Payload::Json(text) => text,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

/// Serializer that captures a top-level `serialize_str` and declines the rest.
struct TextOnly;

macro_rules! decline {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, _: $ty) -> Result<Self::Ok, Self::Error> {
                Ok(None)
            }
        )*
    };
}

fn not_text() -> serde_json::Error {
    ser::Error::custom("payload is not a string")
}

impl Serializer for TextOnly {
    type Ok = Option<String>;
    type Error = serde_json::Error;
    type SerializeSeq = Impossible<Self::Ok, Self::Error>;
    type SerializeTuple = Impossible<Self::Ok, Self::Error>;
    type SerializeTupleStruct = Impossible<Self::Ok, Self::Error>;
    type SerializeTupleVariant = Impossible<Self::Ok, Self::Error>;
    type SerializeMap = Impossible<Self::Ok, Self::Error>;
    type SerializeStruct = Impossible<Self::Ok, Self::Error>;
    type SerializeStructVariant = Impossible<Self::Ok, Self::Error>;

    fn serialize_str(self, text: &str) -> Result<Self::Ok, Self::Error> {
        Ok(Some(text.to_string()))
    }

    decline! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_bytes(&[u8]),
        serialize_unit_struct(&'static str),
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, _: &T) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(None)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(not_text())
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(not_text())
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(not_text())
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(not_text())
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(not_text())
    }

    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(not_text())
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(not_text())
    }
}
