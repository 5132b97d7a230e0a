//! `#[derive(Ssz)]` for SSZ containers.
//!
//! The derive generates impls of `SszSize`, `SszRead`, `SszWrite` and
//! `SszHash` for structs with named fields. Individual impls can be turned
//! off with `#[ssz(derive_read = false)]` and friends. Newtype structs can be
//! marked `#[ssz(transparent)]` to delegate to the single field instead of
//! being treated as one-field containers. Fields marked `#[ssz(skip)]` are
//! not serialized or hashed and are filled in with their default values when
//! deserializing.

use std::borrow::Cow;

use darling::{ast::Data, FromDeriveInput, FromField};
use itertools::Itertools as _;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote, TokenStreamExt as _};
use syn::{
    parse_macro_input, parse_quote,
    punctuated::Punctuated,
    token::{Comma, Where},
    Error, Ident, Member, Path, Type, WhereClause, WherePredicate,
};

#[derive(FromField)]
#[darling(attributes(ssz))]
struct SszField {
    ident: Option<Ident>,
    ty: Type,

    #[darling(default)]
    skip: bool,
}

#[derive(FromDeriveInput)]
#[darling(attributes(ssz))]
struct SszType {
    ident: Ident,
    generics: syn::Generics,
    data: Data<(), SszField>,

    bound: Option<Punctuated<WherePredicate, Comma>>,
    bound_for_read: Option<Punctuated<WherePredicate, Comma>>,
    #[darling(default = "default_to_true")]
    derive_hash: bool,
    #[darling(default = "default_to_true")]
    derive_read: bool,
    #[darling(default = "default_to_true")]
    derive_size: bool,
    #[darling(default = "default_to_true")]
    derive_write: bool,
    // This makes deriving work inside the `ssz` crate itself.
    #[darling(default)]
    internal: bool,
    #[darling(default)]
    transparent: bool,
}

#[proc_macro_derive(Ssz, attributes(ssz))]
pub fn derive(input: TokenStream) -> TokenStream {
    match SszType::from_derive_input(&parse_macro_input!(input)) {
        Ok(ssz_type) => ssz_type.impls().unwrap_or_else(Error::into_compile_error),
        Err(error) => error.write_errors(),
    }
    .into()
}

impl SszType {
    fn impls(&self) -> Result<TokenStream2, Error> {
        let ssz = self.ssz_path()?;
        let ident = &self.ident;
        let (impl_generics, ty_generics, _) = self.generics.split_for_impl();
        let where_clause = self.where_clause(&self.bound);

        let mut impls = quote! {};

        if self.derive_size {
            let size_expr = self.size_expr(&ssz)?;

            impls.append_all(quote! {
                impl #impl_generics #ssz::SszSize for #ident #ty_generics #where_clause {
                    const SIZE: #ssz::Size = #size_expr;
                }
            });
        }

        if self.derive_read {
            let where_clause = self
                .bound_for_read
                .as_ref()
                .map(|_| self.where_clause(&self.bound_for_read))
                .unwrap_or_else(|| where_clause.clone());

            let mut generics = self.generics.clone();
            generics.params.insert(0, parse_quote! { C });
            let (read_impl_generics, _, _) = generics.split_for_impl();

            let body = self.read_fn(&ssz)?;

            impls.append_all(quote! {
                impl #read_impl_generics #ssz::SszRead<C> for #ident #ty_generics #where_clause {
                    #body
                }
            });
        }

        if self.derive_write {
            let write_fixed = self.write_fixed_fn(&ssz)?;
            let write_variable = self.write_variable_fn(&ssz)?;

            impls.append_all(quote! {
                impl #impl_generics #ssz::SszWrite for #ident #ty_generics #where_clause {
                    #write_fixed

                    #write_variable
                }
            });
        }

        if self.derive_hash {
            let packing_factor = self.packing_factor(&ssz)?;
            let hash_tree_root = self.hash_fn(&ssz)?;

            impls.append_all(quote! {
                impl #impl_generics #ssz::SszHash for #ident #ty_generics #where_clause {
                    type PackingFactor = #packing_factor;

                    #hash_tree_root
                }
            });
        }

        Ok(impls)
    }

    fn ssz_path(&self) -> Result<Path, Error> {
        if self.internal {
            return Ok(parse_quote! { crate });
        }

        let found = proc_macro_crate::crate_name("ssz")
            .map_err(|error| Error::new(Span::call_site(), error))?;

        let name = match found {
            proc_macro_crate::FoundCrate::Itself => Cow::Borrowed("ssz"),
            proc_macro_crate::FoundCrate::Name(renamed) => Cow::Owned(renamed),
        };

        let ident = Ident::new(&name, Span::call_site());

        Ok(parse_quote! { ::#ident })
    }

    fn where_clause(
        &self,
        bound: &Option<Punctuated<WherePredicate, Comma>>,
    ) -> Option<WhereClause> {
        bound
            .clone()
            .map(|predicates| WhereClause {
                where_token: Where::default(),
                predicates,
            })
            .or_else(|| self.generics.where_clause.clone())
    }

    fn size_expr(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (_, ty) = self.single_unskipped_field()?;
            return Ok(quote! { <#ty as #ssz::SszSize>::SIZE });
        }

        let size_exprs = self
            .unskipped_fields()?
            .into_iter()
            .map(|(_, ty)| quote! { <#ty as #ssz::SszSize>::SIZE })
            .collect_vec();

        Ok(quote! {
            #ssz::Size::for_container([
                #(#size_exprs,)*
            ])
        })
    }

    fn read_fn(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;
            let skipped = self.skipped_field_defaults();

            return Ok(quote! {
                #[inline]
                fn from_ssz_unchecked(
                    context: &C,
                    bytes: &[u8],
                ) -> ::core::result::Result<Self, #ssz::ReadError> {
                    ::core::result::Result::Ok(Self {
                        #member: #ssz::SszRead::from_ssz_unchecked(context, bytes)?,
                        #(#skipped)*
                    })
                }
            });
        }

        let fixed_part_stmts = self.unskipped_fields()?.into_iter().map(|(member, ty)| {
            let offset_ident = offset_ident(&member);

            quote! {
                let #offset_ident = match <#ty as #ssz::SszSize>::SIZE {
                    #ssz::Size::Fixed { .. } => current_position_in_fixed,
                    #ssz::Size::Variable { .. } => {
                        let end = current_position_in_fixed + #ssz::BYTES_PER_LENGTH_OFFSET;
                        let subslice = #ssz::subslice(bytes, current_position_in_fixed..end)?;

                        #ssz::read_offset_unchecked(subslice)?
                    }
                };

                let current_position_in_fixed =
                    current_position_in_fixed + <#ty as #ssz::SszSize>::SIZE.fixed_part();
            }
        });

        // Fields are deserialized in reverse so that the end of each variable
        // part is known. Errors are still only reported for invalid data.
        let variable_part_stmts = self
            .unskipped_fields()?
            .into_iter()
            .rev()
            .map(|(member, ty)| {
                let offset_ident = offset_ident(&member);
                let value_ident = value_ident(&member);

                quote! {
                    let (lowest_used_offset, end) = match <#ty as #ssz::SszSize>::SIZE {
                        #ssz::Size::Fixed { size } => (lowest_used_offset, #offset_ident + size),
                        #ssz::Size::Variable { .. } => (#offset_ident, lowest_used_offset),
                    };

                    let subslice = #ssz::subslice(bytes, #offset_ident..end)?;
                    let #value_ident = #ssz::SszRead::from_ssz_unchecked(context, subslice)?;
                }
            });

        let members = self.all_fields()?.into_iter().map(|(member, field)| {
            if field.skip {
                let ty = &field.ty;
                quote! { #member: <#ty as ::core::default::Default>::default(), }
            } else {
                let value_ident = value_ident(&member);
                quote! { #member: #value_ident, }
            }
        });

        Ok(quote! {
            fn from_ssz_unchecked(
                context: &C,
                bytes: &[u8],
            ) -> ::core::result::Result<Self, #ssz::ReadError> {
                let current_position_in_fixed = 0;
                let lowest_used_offset = bytes.len();

                #(#fixed_part_stmts)*
                #(#variable_part_stmts)*

                // The first offset is only checked after deserializing all
                // fields. The impl may waste time deserializing invalid data.
                let expected = current_position_in_fixed;
                let actual = lowest_used_offset;

                if actual != expected {
                    let error = #ssz::ReadError::ContainerFirstOffsetMismatch { expected, actual };
                    return ::core::result::Result::Err(error);
                }

                ::core::result::Result::Ok(Self { #(#members)* })
            }
        })
    }

    fn write_fixed_fn(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;

            return Ok(quote! {
                #[inline]
                fn write_fixed(&self, bytes: &mut [u8]) {
                    #ssz::SszWrite::write_fixed(&self.#member, bytes)
                }
            });
        }

        let stmts = self.unskipped_fields()?.into_iter().map(|(member, ty)| {
            quote! {
                let size = <#ty as #ssz::SszSize>::SIZE.fixed_part();
                #ssz::SszWrite::write_fixed(&self.#member, &mut bytes[..size]);
                let bytes = &mut bytes[size..];
            }
        });

        Ok(quote! {
            fn write_fixed(&self, bytes: &mut [u8]) {
                #(#stmts)*
            }
        })
    }

    fn write_variable_fn(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;

            return Ok(quote! {
                #[inline]
                fn write_variable(
                    &self,
                    bytes: &mut ::std::vec::Vec<u8>,
                ) -> ::core::result::Result<(), #ssz::WriteError> {
                    #ssz::SszWrite::write_variable(&self.#member, bytes)
                }
            });
        }

        let fixed_part_stmts = self.unskipped_fields()?.into_iter().map(|(member, ty)| {
            let offset_ident = offset_ident(&member);

            quote! {
                let #offset_ident = bytes.len();
                let length_with_fixed_part = #offset_ident + <#ty as #ssz::SszSize>::SIZE.fixed_part();

                bytes.resize(length_with_fixed_part, 0);

                if let #ssz::Size::Fixed { .. } = <#ty as #ssz::SszSize>::SIZE {
                    let subslice = &mut bytes[#offset_ident..length_with_fixed_part];
                    #ssz::SszWrite::write_fixed(&self.#member, subslice);
                }
            }
        });

        let variable_part_stmts = self.unskipped_fields()?.into_iter().map(|(member, ty)| {
            let offset_ident = offset_ident(&member);

            quote! {
                if let #ssz::Size::Variable { .. } = <#ty as #ssz::SszSize>::SIZE {
                    let offset = bytes.len() - length_before;
                    #ssz::write_offset(bytes, #offset_ident, offset)?;
                    #ssz::SszWrite::write_variable(&self.#member, bytes)?;
                }
            }
        });

        Ok(quote! {
            fn write_variable(
                &self,
                bytes: &mut ::std::vec::Vec<u8>,
            ) -> ::core::result::Result<(), #ssz::WriteError> {
                let length_before = bytes.len();
                #(#fixed_part_stmts)*
                #(#variable_part_stmts)*
                ::core::result::Result::Ok(())
            }
        })
    }

    fn packing_factor(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (_, ty) = self.single_unskipped_field()?;
            Ok(quote! { <#ty as #ssz::SszHash>::PackingFactor })
        } else {
            Ok(quote! { #ssz::U1 })
        }
    }

    fn hash_fn(&self, ssz: &Path) -> Result<TokenStream2, Error> {
        if self.transparent {
            let (member, _) = self.single_unskipped_field()?;

            return Ok(quote! {
                #[inline]
                fn hash_tree_root(&self) -> #ssz::H256 {
                    #ssz::SszHash::hash_tree_root(&self.#member)
                }
            });
        }

        // The Merkle tree over the fields is built at macro expansion time,
        // padding each level with the zero hash of the level below.
        let mut nodes = self
            .unskipped_fields()?
            .into_iter()
            .map(|(member, _)| quote! { #ssz::SszHash::hash_tree_root(&self.#member) })
            .collect_vec();

        let mut height = 0_usize;

        let root = loop {
            match nodes.len() {
                0 => {
                    return Err(Error::new(
                        Span::call_site(),
                        "struct has no unskipped fields",
                    ))
                }
                1 => {
                    break nodes
                        .into_iter()
                        .exactly_one()
                        .expect("this branch is only taken when exactly 1 node is left")
                }
                _ => {
                    let zero_hash = quote! { #ssz::hashing::ZERO_HASHES[#height] };

                    nodes = nodes
                        .into_iter()
                        .chain(core::iter::once(zero_hash))
                        .tuples()
                        .map(|(left, right)| quote! { #ssz::hashing::hash_256_256(#left, #right) })
                        .collect();

                    height += 1;
                }
            }
        };

        Ok(quote! {
            fn hash_tree_root(&self) -> #ssz::H256 {
                #root
            }
        })
    }

    fn single_unskipped_field(&self) -> Result<(Member, &Type), Error> {
        self.unskipped_fields()?
            .into_iter()
            .map(|(member, ty)| (member, ty))
            .exactly_one()
            .map_err(|_| {
                Error::new(
                    Span::call_site(),
                    "struct with transparent attribute must have exactly one unskipped field",
                )
            })
    }

    fn skipped_field_defaults(&self) -> Vec<TokenStream2> {
        match &self.data {
            Data::Struct(fields) => fields
                .iter()
                .enumerate()
                .filter(|(_, field)| field.skip)
                .map(|(position, field)| {
                    let member = member(position, field);
                    let ty = &field.ty;
                    quote! { #member: <#ty as ::core::default::Default>::default(), }
                })
                .collect(),
            Data::Enum(_) => vec![],
        }
    }

    fn unskipped_fields(&self) -> Result<Vec<(Member, &Type)>, Error> {
        Ok(self
            .all_fields()?
            .into_iter()
            .filter(|(_, field)| !field.skip)
            .map(|(member, field)| (member, &field.ty))
            .collect())
    }

    fn all_fields(&self) -> Result<Vec<(Member, &SszField)>, Error> {
        match &self.data {
            // Enums could represent SSZ unions, but none of the containers in
            // the stable parts of `consensus-specs` are unions.
            Data::Enum(_) => Err(Error::new(
                Span::call_site(),
                "SSZ unions are not implemented",
            )),
            Data::Struct(fields) if fields.is_empty() => Err(Error::new(
                Span::call_site(),
                "SSZ containers with no fields are illegal",
            )),
            Data::Struct(fields) => Ok(fields
                .iter()
                .enumerate()
                .map(|(position, field)| (member(position, field), field))
                .collect()),
        }
    }
}

fn member(position: usize, field: &SszField) -> Member {
    field
        .ident
        .clone()
        .map(Member::Named)
        .unwrap_or_else(|| Member::Unnamed(position.into()))
}

// Formatting like this is needed to make newtype structs work.
fn offset_ident(member: &Member) -> Ident {
    match member {
        Member::Named(ident) => format_ident!("offset_of_{}", ident),
        Member::Unnamed(index) => format_ident!("offset_of_{}", index.index),
    }
}

fn value_ident(member: &Member) -> Ident {
    match member {
        Member::Named(ident) => format_ident!("value_of_{}", ident),
        Member::Unnamed(index) => format_ident!("value_of_{}", index.index),
    }
}

// The value of darling's `default` attribute must be a path to a function.
const fn default_to_true() -> bool {
    true
}
