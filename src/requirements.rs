use std::fmt;

use crate::{AccessMode, BadHandler, Error, Order, Result, Shape, Type};

/// Properties an array must have, for [`to_required_array`](crate::ndarrays::to_required_array).
///
/// Unset properties are unconstrained.
/// A bad handler implies its type, and a type without a handler implies
/// the type's default handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirements {
    mode: Option<AccessMode>,
    data_type: Option<Type>,
    bad_handler: Option<BadHandler>,
    order: Option<Order>,
    window: Option<Shape>,
    random: bool,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Fails if a bad handler of another type is already required.
    pub fn with_data_type(mut self, data_type: Type) -> Result<Self> {
        if let Some(bh) = &self.bad_handler {
            if bh.data_type() != data_type {
                return Err(Error::invalid(format!(
                    "cannot require {data_type} with a {} bad handler",
                    bh.data_type()
                )));
            }
        }
        self.data_type = Some(data_type);
        Ok(self)
    }

    /// Fails if another type is already required.
    pub fn with_bad_handler(mut self, bad_handler: BadHandler) -> Result<Self> {
        if let Some(t) = self.data_type {
            if t != bad_handler.data_type() {
                return Err(Error::invalid(format!(
                    "cannot require {t} with a {} bad handler",
                    bad_handler.data_type()
                )));
            }
        }
        self.data_type = Some(bad_handler.data_type());
        self.bad_handler = Some(bad_handler);
        Ok(self)
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_window(mut self, window: Shape) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    pub fn mode(&self) -> Option<AccessMode> {
        self.mode
    }

    pub fn data_type(&self) -> Option<Type> {
        self.data_type
    }

    pub fn bad_handler(&self) -> Option<&BadHandler> {
        self.bad_handler.as_ref()
    }

    pub fn order(&self) -> Option<Order> {
        self.order
    }

    pub fn window(&self) -> Option<&Shape> {
        self.window.as_ref()
    }

    pub fn random(&self) -> bool {
        self.random
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(m) = self.mode {
            parts.push(format!("mode={m:?}"));
        }
        match (&self.bad_handler, self.data_type) {
            (Some(bh), _) => parts.push(format!("bad={bh}")),
            (None, Some(t)) => parts.push(format!("type={t}")),
            _ => (),
        }
        if let Some(o) = self.order {
            parts.push(format!("order={o}"));
        }
        if let Some(w) = &self.window {
            parts.push(format!("window={}", w.bounds_string()));
        }
        if self.random {
            parts.push("random".to_owned());
        }
        write!(f, "Requirements({})", parts.join(", "))
    }
}
