/// STL file parser for binary and ASCII formats
use std::collections::HashMap;

use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::geometry::Mesh;

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

type Facet = [Point3<f32>; 3];

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, String> {
    if data.len() < HEADER_LEN + 4 {
        return Err("File too small to be a valid STL".to_string());
    }

    let (body, triangle_count) = preceded(take(HEADER_LEN), le_u32)(data)
        .map_err(|e: nom::Err<nom::error::Error<&[u8]>>| format!("Invalid STL header: {e:?}"))?;
    let triangle_count = triangle_count as usize;

    if body.len() < triangle_count * RECORD_LEN {
        return Err(format!(
            "Unexpected end of file: {triangle_count} triangles declared, {} bytes of records",
            body.len()
        ));
    }

    let (_, facets) = count(parse_binary_facet, triangle_count)(body)
        .map_err(|e| format!("Failed to parse binary STL: {e:?}"))?;

    Ok(weld(&facets))
}

fn parse_binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    // Normal is recomputed from the winding when needed
    let (input, _normal) = take(12usize)(input)?;
    let (input, vertices) = count(parse_binary_point, 3)(input)?;
    // Attribute byte count
    let (input, _) = take(2usize)(input)?;
    Ok((input, [vertices[0], vertices[1], vertices[2]]))
}

fn parse_binary_point(input: &[u8]) -> IResult<&[u8], Point3<f32>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Point3::new(x, y, z)))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, String> {
    match parse_ascii_stl_impl(input) {
        Ok((_, facets)) => Ok(weld(&facets)),
        Err(e) => Err(format!("Failed to parse ASCII STL: {:?}", e)),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, facets) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, facets))
}

fn parse_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, [v1, v2, v3]))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    parse_vector3(input)
}

fn parse_vector3(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, Point3::new(x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, String> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if data[start..].starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Merge bit-identical corners of a triangle soup into shared vertices
fn weld(facets: &[Facet]) -> Mesh {
    let mut mesh = Mesh::with_capacity(facets.len() / 2, facets.len());
    let mut index: HashMap<[u32; 3], usize> = HashMap::new();

    for facet in facets {
        let mut corners = [0usize; 3];
        for (corner, p) in corners.iter_mut().zip(facet) {
            // -0.0 and 0.0 are the same corner
            let key = [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f32::to_bits);
            *corner = *index
                .entry(key)
                .or_insert_with(|| mesh.add_vertex(p.cast::<f64>()));
        }
        mesh.add_face(corners[0], corners[1], corners[2]);
    }

    mesh
}
