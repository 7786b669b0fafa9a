//! Fixed 50-item factual workload corpus.
//!
//! Items 0-9 are the original corpus and must keep their positions so
//! traces collected against earlier revisions stay comparable. Items 10-49
//! expand coverage across five domains with deliberate entity-overlap
//! clusters (Musk: 3, 8, 10-12; Nobel: 0, 13-16; computing pioneers:
//! 5, 7, 17-20) to exercise prefix-breaking entity reuse.

pub const TEST_CORPUS: [&str; 50] = [
    "Marie Curie was a physicist and chemist who conducted pioneering research on radioactivity. She was the first woman to win a Nobel Prize.",
    "Albert Einstein developed the theory of general relativity, one of the two pillars of modern physics. He was born in Ulm, Germany in 1879.",
    "The Python programming language was created by Guido van Rossum and first released in 1991. It emphasizes code readability.",
    "Tesla Inc., founded by Martin Eberhard and Marc Tarpenning, is headquartered in Austin, Texas. Elon Musk joined as chairman in 2004.",
    "The Great Wall of China stretches over 13,000 miles and was built over many centuries starting from the 7th century BC.",
    "Ada Lovelace is often regarded as the first computer programmer. She worked with Charles Babbage on the Analytical Engine.",
    "The Amazon River is the largest river by volume of water flow in the world. It flows through Brazil, Peru, and Colombia.",
    "Alan Turing proposed the concept of the Turing machine in 1936, which became the foundation of modern computer science.",
    "SpaceX, founded by Elon Musk in 2002, developed the Falcon 9 rocket and the Dragon spacecraft for NASA missions.",
    "The Mediterranean Sea is connected to the Atlantic Ocean through the Strait of Gibraltar and borders Europe, Africa, and Asia.",
    "Elon Musk co-founded Neuralink in 2016 to develop brain-computer interface technology. The company implanted its first device in a human patient in 2024.",
    "The Boring Company, founded by Elon Musk in 2016, builds underground transportation tunnels. Its first commercial project was the Las Vegas Convention Center Loop.",
    "Elon Musk acquired Twitter in October 2022 for approximately $44 billion and rebranded the platform to X in July 2023.",
    "Niels Bohr received the Nobel Prize in Physics in 1922 for his contributions to understanding atomic structure and quantum theory.",
    "Dorothy Hodgkin won the Nobel Prize in Chemistry in 1964 for determining the structures of important biochemical substances using X-ray crystallography.",
    "Martin Luther King Jr. was awarded the Nobel Peace Prize in 1964 for his nonviolent resistance to racial prejudice in the United States.",
    "Tu Youyou shared the Nobel Prize in Physiology or Medicine in 2015 for discovering artemisinin, a drug that significantly reduced malaria mortality.",
    "Grace Hopper developed the first compiler for a computer programming language and popularized the term 'debugging' in computing.",
    "John von Neumann designed the architecture that became the basis for most modern computers. He also contributed to game theory and quantum mechanics.",
    "Dennis Ritchie created the C programming language at Bell Labs in 1972 and co-developed the Unix operating system with Ken Thompson.",
    "Tim Berners-Lee invented the World Wide Web in 1989 while working at CERN. He also founded the World Wide Web Consortium to develop web standards.",
    "Isaac Newton published Principia Mathematica in 1687, establishing the laws of motion and universal gravitation that dominated physics for over two centuries.",
    "Rosalind Franklin's X-ray diffraction images of DNA were crucial to discovering the double helix structure. She worked at King's College London.",
    "The Hubble Space Telescope was launched in 1990 and has made over 1.5 million observations. It orbits Earth at about 547 kilometers altitude.",
    "CRISPR-Cas9 gene editing technology was developed by Jennifer Doudna and Emmanuelle Charpentier. They received the Nobel Prize in Chemistry in 2020.",
    "Charles Darwin published On the Origin of Species in 1859 after his voyage on HMS Beagle. His theory of natural selection transformed biology.",
    "The Large Hadron Collider at CERN is the world's largest particle accelerator, located beneath the France-Switzerland border near Geneva.",
    "Nikola Tesla invented the alternating current induction motor and contributed to the development of the modern AC electricity supply system.",
    "Linux was created by Linus Torvalds in 1991 as a free open-source operating system kernel. It now powers most of the world's servers and supercomputers.",
    "Google was founded by Larry Page and Sergey Brin in 1998 while they were PhD students at Stanford University. Its search engine processed over 8.5 billion queries per day by 2024.",
    "The first iPhone was released by Apple in June 2007, designed under the leadership of Steve Jobs. It revolutionized the smartphone industry.",
    "NVIDIA was founded by Jensen Huang, Chris Malachowsky, and Curtis Priem in 1993. Its GPUs became essential for AI and deep learning workloads.",
    "Amazon Web Services launched in 2006, pioneering cloud computing infrastructure. It became the largest cloud provider by market share.",
    "OpenAI was founded in December 2015 as a nonprofit AI research lab. It released GPT-3 in 2020 and ChatGPT in November 2022.",
    "The Nile River flows northward through eleven countries in Africa and is traditionally considered the longest river in the world at about 6,650 km.",
    "Mount Everest, located in the Himalayas on the border of Nepal and Tibet, stands at 8,849 meters as the highest point on Earth.",
    "The Sahara Desert covers approximately 9.2 million square kilometers across North Africa, making it the largest hot desert in the world.",
    "Japan consists of 6,852 islands in the Pacific Ocean. Its four largest islands are Honshu, Hokkaido, Kyushu, and Shikoku.",
    "The Panama Canal connects the Atlantic and Pacific Oceans across the Isthmus of Panama. It was completed in 1914 after a decade of construction.",
    "Lake Baikal in Siberia, Russia is the deepest lake in the world at 1,642 meters. It contains about 20% of the world's unfrozen surface fresh water.",
    "The Roman Empire at its peak under Emperor Trajan around 117 AD controlled territory spanning from Britain to Mesopotamia.",
    "The printing press was invented by Johannes Gutenberg around 1440 in Mainz, Germany. It enabled the mass production of books and accelerated the spread of knowledge.",
    "The Apollo 11 mission landed the first humans on the Moon on July 20, 1969. Neil Armstrong and Buzz Aldrin walked on the lunar surface while Michael Collins orbited above.",
    "The Silk Road was an ancient network of trade routes connecting China to the Mediterranean. It facilitated the exchange of goods, culture, and ideas for over 1,500 years.",
    "The Industrial Revolution began in Britain in the late 18th century, transforming manufacturing from hand production to machine-based processes.",
    "Microsoft was founded by Bill Gates and Paul Allen in 1975. Its Windows operating system became the dominant platform for personal computers.",
    "The Tokyo Stock Exchange is the largest stock exchange in Asia by market capitalization. It merged with the Osaka Securities Exchange in 2013 to form Japan Exchange Group.",
    "Samsung Electronics, headquartered in Suwon, South Korea, is the world's largest manufacturer of memory chips and smartphones by unit sales.",
    "The FIFA World Cup is the most widely viewed sporting event in the world. The 2022 tournament in Qatar attracted an estimated 5 billion viewers.",
    "Netflix was founded by Reed Hastings and Marc Randolph in 1997 as a DVD rental service. It launched its streaming platform in 2007 and had over 260 million subscribers by 2024.",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_has_fifty_nonempty_items() {
        assert_eq!(TEST_CORPUS.len(), 50);
        assert!(TEST_CORPUS.iter().all(|row| !row.is_empty()));
    }

    #[test]
    fn original_ten_items_keep_positions() {
        assert!(TEST_CORPUS[0].starts_with("Marie Curie"));
        assert!(TEST_CORPUS[9].starts_with("The Mediterranean Sea"));
    }
}
