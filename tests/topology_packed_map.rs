use mesh_topomap::prelude::*;

fn strip() -> CellSet {
    let mut b = ExplicitConnectivityBuilder::new();
    b.add_cell(ShapeType::Triangle, &[0, 1, 3])
        .add_cell(ShapeType::Quad, &[1, 2, 5, 4])
        .add_cell(ShapeType::Triangle, &[1, 4, 3]);
    CellSetExplicit::new(6, b.build(6).unwrap()).unwrap().into()
}

fn adjacency_sums(
    cells: &mut CellSet,
    topology: Topology,
    n: usize,
) -> Result<(Vec<u32>, Vec<u32>), TopoMapError> {
    let mut count = Array::<u32>::zeros(n);
    let mut sum = Array::<u32>::zeros(n);
    TopologyPackedMapOp::new(
        cells,
        topology,
        (),
        (&mut count, &mut sum),
        IndexMap::Identity,
        |_shape: ShapeType, ids: &[u32], ()| (ids.len() as u32, ids.iter().sum::<u32>()),
    )
    .go_host()?;
    Ok((count.to_vec()?, sum.to_vec()?))
}

#[test]
fn explicit_nodes_of_cells() -> Result<(), TopoMapError> {
    let mut cells = strip();
    let (count, sum) = adjacency_sums(&mut cells, Topology::NodesOfCells, 3)?;
    assert_eq!(count, vec![3, 4, 3]);
    assert_eq!(sum, vec![4, 12, 8]);
    Ok(())
}

#[test]
fn explicit_cells_of_nodes() -> Result<(), TopoMapError> {
    let mut cells = strip();
    let (count, _) = adjacency_sums(&mut cells, Topology::CellsOfNodes, 6)?;
    assert_eq!(count, vec![1, 3, 1, 2, 2, 1]);
    Ok(())
}

#[test]
fn explicit_cells_of_cells_share_an_edge() -> Result<(), TopoMapError> {
    let mut cells = strip();
    let (count, sum) = adjacency_sums(&mut cells, Topology::CellsOfCells, 3)?;
    assert_eq!(count, vec![1, 1, 2]);
    assert_eq!(sum, vec![2, 2, 1]);
    Ok(())
}

#[test]
fn structured_cells_of_nodes() -> Result<(), TopoMapError> {
    let mut cells: CellSet = RegularStructure::new(&[2, 2])?.into();
    let (count, _) = adjacency_sums(&mut cells, Topology::CellsOfNodes, 9)?;
    assert_eq!(count, vec![1, 2, 1, 2, 4, 2, 1, 2, 1]);
    Ok(())
}

#[test]
fn structured_neighbours_through_gather() -> Result<(), TopoMapError> {
    let mut cells: CellSet = RegularStructure::new(&[3, 3])?.into();
    let ids = Array::from_vec(vec![4u32, 0, 8]);
    let mut out = Array::<u32>::zeros(3);
    TopologyPackedMapOp::new(
        &mut cells,
        Topology::CellsOfCells,
        (),
        &mut out,
        IndexMap::gather(&ids),
        |shape: ShapeType, nbrs: &[u32], ()| {
            assert_eq!(shape, ShapeType::Quad);
            nbrs.len() as u32
        },
    )
    .go_host()?;
    assert_eq!(out.host()?, &[4, 2, 2]);
    Ok(())
}

#[test]
fn regular_structure_serde() {
    let s = RegularStructure::new(&[4, 2]).unwrap();
    let json = serde_json::to_string(&s).unwrap();
    let back: RegularStructure = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
    assert_eq!(back.num_nodes(), 15);
}

#[test]
fn malformed_regular_structure_is_rejected() {
    for json in [
        r#"{"dimension":1,"cells":[0,1,1]}"#,
        r#"{"dimension":0,"cells":[1,1,1]}"#,
        r#"{"dimension":4,"cells":[2,2,2]}"#,
        r#"{"dimension":2,"cells":[2,2,5]}"#,
    ] {
        let err = serde_json::from_str::<RegularStructure>(json).unwrap_err();
        assert!(err.to_string().contains("invalid regular structure"), "{json}: {err}");
    }
}
