use std::fmt::Write;

use super::cursor::Cursor;
use crate::error::{ConfigurationError, INVALID_PATH};
use crate::graph::{Kind, Shape, TypeGraph};

/// Accessor suffix that reads a union's discriminator.
pub const DISCRIMINATOR_ACCESS: &str = "._d()";

impl<T: Copy + Eq, F: Copy + Eq> Cursor<T, F> {
    /// Accessor path of the current position, e.g. `inner.points[2].x`.
    pub fn path<G>(&self, graph: &G) -> Result<String, ConfigurationError>
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        let mut out = String::new();
        self.render_path(graph, &mut out)?;
        Ok(out)
    }

    fn render_path<G>(&self, graph: &G, out: &mut String) -> Result<(), ConfigurationError>
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        match self.kind {
            Kind::Structure => {
                let field = self.field_at_position(graph).ok_or_else(|| self.invalid_path(graph))?;
                if self.level > 0 {
                    out.push('.');
                }
                out.push_str(graph.field_name(field));
            }
            Kind::Union => out.push_str(DISCRIMINATOR_ACCESS),
            Kind::Array => {
                let _ = write!(out, "[{}]", self.pos);
            }
            Kind::Primitive => {}
            Kind::Invalid => return Err(self.invalid_path(graph)),
        }
        if let Some(child) = &self.child {
            child.render_path(graph, out)?;
        }
        Ok(())
    }

    /// The member the cursor stands on: the one being descended into, or
    /// the one just passed if there is no child.
    fn field_at_position<G>(&self, graph: &G) -> Option<F>
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        let index = match self.child {
            Some(_) => self.pos,
            None => self.pos.checked_sub(1)?,
        };
        match graph.shape(self.root_type(graph)?) {
            Shape::Structure(fields) => fields.get(index).copied(),
            _ => None,
        }
    }

    fn invalid_path<G>(&self, graph: &G) -> ConfigurationError
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        let location = self.root_type(graph).and_then(|ty| graph.type_location(ty));
        ConfigurationError::at(location, INVALID_PATH)
    }
}
